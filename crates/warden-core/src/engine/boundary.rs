use serde::Serialize;

use crate::ability::Ability;
use crate::domain::{PermissionAction, PermissionSubject, ScopeKind};

use super::ScopedAbility;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_permissions: Vec<String>,
}

impl BoundaryResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            missing_permissions: Vec::new(),
        }
    }

    fn from_missing(missing_permissions: Vec<String>) -> Self {
        Self {
            is_valid: missing_permissions.is_empty(),
            missing_permissions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot compare {requestor} ability against {target} ability")]
pub struct ScopeMismatch {
    pub requestor: ScopeKind,
    pub target: ScopeKind,
}

/// Checks that `requestor` holds every permission `target` is allowed.
///
/// Each allow rule of the target is expanded into its `action:subject`
/// pairs and checked as a type-level query against the requestor. Deny
/// rules and conditions on the target are not considered. With `enforce`
/// off the check is bypassed and always valid.
pub fn check_boundary<A, S>(
    requestor: &Ability<A, S>,
    target: &Ability<A, S>,
    enforce: bool,
) -> BoundaryResult
where
    A: PermissionAction,
    S: PermissionSubject,
{
    if !enforce {
        return BoundaryResult::valid();
    }

    let mut missing: Vec<String> = Vec::new();
    for rule in target.rules().iter().filter(|r| !r.is_inverted()) {
        for (action, subject) in rule.pairs() {
            if requestor.can(action, subject) {
                continue;
            }
            let entry = format!("{action}:{subject}");
            if !missing.contains(&entry) {
                missing.push(entry);
            }
        }
    }

    BoundaryResult::from_missing(missing)
}

pub fn check_scoped_boundary(
    requestor: &ScopedAbility,
    target: &ScopedAbility,
    enforce: bool,
) -> Result<BoundaryResult, ScopeMismatch> {
    match (requestor, target) {
        (ScopedAbility::Project(r), ScopedAbility::Project(t)) => Ok(check_boundary(r, t, enforce)),
        (ScopedAbility::Organization(r), ScopedAbility::Organization(t)) => {
            Ok(check_boundary(r, t, enforce))
        }
        _ => Err(ScopeMismatch {
            requestor: requestor.kind(),
            target: target.kind(),
        }),
    }
}

/// User-facing message for a refused privilege change.
pub fn permission_error_message(base: &str, enforce: bool, action: &str, subject: &str) -> String {
    if enforce {
        format!("{base}: you cannot grant permissions you do not possess ({action} on {subject})")
    } else {
        format!("{base}: missing {action} on {subject}")
    }
}
