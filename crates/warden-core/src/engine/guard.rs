use serde_json::Value;

use crate::ability::{Ability, ProjectAbility};
use crate::domain::{PermissionAction, PermissionSubject, ProjectAction, ProjectSubject};

/// A denied check, for callers that prefer `?` over branching on `can`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("forbidden: not allowed to {action} {subject}")]
pub struct Forbidden {
    pub action: String,
    pub subject: String,
}

impl Forbidden {
    pub fn new(action: impl ToString, subject: impl ToString) -> Self {
        Self {
            action: action.to_string(),
            subject: subject.to_string(),
        }
    }
}

pub fn ensure_can<A, S>(ability: &Ability<A, S>, action: A, subject: S) -> Result<(), Forbidden>
where
    A: PermissionAction,
    S: PermissionSubject,
{
    if ability.can(action, subject) {
        Ok(())
    } else {
        Err(Forbidden::new(action, subject))
    }
}

pub fn ensure_can_on<A, S>(
    ability: &Ability<A, S>,
    action: A,
    subject: S,
    instance: &Value,
) -> Result<(), Forbidden>
where
    A: PermissionAction,
    S: PermissionSubject,
{
    if ability.can_on(action, subject, instance) {
        Ok(())
    } else {
        Err(Forbidden::new(action, subject))
    }
}

/// Secret value access under either the combined `read` action or the
/// split `describeSecret` + `readValue` pair.
pub fn has_secret_read_value_or_describe(ability: &ProjectAbility, instance: Option<&Value>) -> bool {
    let allowed = |action| ability.check(action, ProjectSubject::Secrets, instance);

    allowed(ProjectAction::Read)
        || (allowed(ProjectAction::DescribeSecret) && allowed(ProjectAction::ReadValue))
}

pub fn ensure_secret_read_value_or_describe(
    ability: &ProjectAbility,
    instance: Option<&Value>,
) -> Result<(), Forbidden> {
    if has_secret_read_value_or_describe(ability, instance) {
        Ok(())
    } else {
        Err(Forbidden::new(ProjectAction::ReadValue, ProjectSubject::Secrets))
    }
}
