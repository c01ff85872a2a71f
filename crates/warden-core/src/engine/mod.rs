mod boundary;
mod compose;
mod guard;
mod resolve;
mod temporal;

pub use boundary::{
    BoundaryResult, ScopeMismatch, check_boundary, check_scoped_boundary,
    permission_error_message,
};
pub use compose::{build_ability, rules_for_assignment};
pub use guard::{
    Forbidden, ensure_can, ensure_can_on, ensure_secret_read_value_or_describe,
    has_secret_read_value_or_describe,
};
pub use resolve::{PermissionResolver, RoleAbility, RoleInfo};
pub use temporal::{active_assignments, is_active_at};

use std::future::Future;

use serde_json::Value;

use crate::ability::{OrgAbility, ProjectAbility};
use crate::assignment::{ActorRef, CustomRole, RoleAssignment, ScopeRef};
use crate::domain::{ScopeKind, UnknownVariant};

/// The only failure that leaves the engine: the collaborator store could
/// not answer. Every other anomaly degrades to fewer rules.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("store error: {0}")]
    Store(String),
}

pub trait AssignmentReader: Send + Sync {
    /// Every role row the actor holds in the scope, in store order. An actor
    /// without membership yields an empty list.
    fn read_assignments(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
    ) -> impl Future<Output = Result<Vec<RoleAssignment>, ResolveError>> + Send;

    fn read_custom_role(
        &self,
        scope: &ScopeRef,
        slug: &str,
    ) -> impl Future<Output = Result<Option<CustomRole>, ResolveError>> + Send;

    /// Project a service token is bound to, if the token exists.
    fn read_service_token_project(
        &self,
        token_id: &str,
    ) -> impl Future<Output = Result<Option<String>, ResolveError>> + Send;
}

/// An ability tagged with the permission universe it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopedAbility {
    Organization(OrgAbility),
    Project(ProjectAbility),
}

impl ScopedAbility {
    pub fn kind(&self) -> ScopeKind {
        match self {
            ScopedAbility::Organization(_) => ScopeKind::Organization,
            ScopedAbility::Project(_) => ScopeKind::Project,
        }
    }

    pub fn as_project(&self) -> Option<&ProjectAbility> {
        match self {
            ScopedAbility::Project(ability) => Some(ability),
            ScopedAbility::Organization(_) => None,
        }
    }

    pub fn as_org(&self) -> Option<&OrgAbility> {
        match self {
            ScopedAbility::Organization(ability) => Some(ability),
            ScopedAbility::Project(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    pub fn rule_count(&self) -> usize {
        match self {
            ScopedAbility::Organization(ability) => ability.len(),
            ScopedAbility::Project(ability) => ability.len(),
        }
    }

    /// Evaluates a query given as wire strings, parsing them into the
    /// ability's own action and subject types.
    pub fn can_named(
        &self,
        action: &str,
        subject: &str,
        instance: Option<&Value>,
    ) -> Result<bool, UnknownVariant> {
        Ok(match self {
            ScopedAbility::Organization(ability) => {
                ability.check(action.parse()?, subject.parse()?, instance)
            }
            ScopedAbility::Project(ability) => {
                ability.check(action.parse()?, subject.parse()?, instance)
            }
        })
    }
}
