use chrono::{DateTime, Utc};

use warden_core::assignment::{ActorRef, CUSTOM_ROLE_SLUG, CustomRole, RoleAssignment, ScopeRef};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// A role to hand to an actor: either a built-in slug or a custom role of
/// the same scope, optionally time-boxed.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleGrant {
    pub(crate) role: String,
    pub(crate) custom_role: Option<String>,
    pub(crate) is_temporary: bool,
    pub(crate) temporary_access_start_time: Option<DateTime<Utc>>,
    pub(crate) temporary_access_end_time: Option<DateTime<Utc>>,
}

impl RoleGrant {
    pub fn builtin(slug: impl Into<String>) -> Self {
        Self {
            role: slug.into(),
            custom_role: None,
            is_temporary: false,
            temporary_access_start_time: None,
            temporary_access_end_time: None,
        }
    }

    pub fn custom(custom_role_slug: impl Into<String>) -> Self {
        Self {
            custom_role: Some(custom_role_slug.into()),
            ..Self::builtin(CUSTOM_ROLE_SLUG)
        }
    }

    pub fn temporary(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.is_temporary = true;
        self.temporary_access_start_time = start;
        self.temporary_access_end_time = end;
        self
    }
}

/// Role rows held by actors. Custom-role permissions are joined into each
/// row; an actor without membership gets an empty list, not an error.
pub trait MembershipStore: Send + Sync {
    fn project_memberships(
        &self,
        actor: &ActorRef,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<RoleAssignment>, StorageError>> + Send;

    /// Only active organization memberships are returned.
    fn org_memberships(
        &self,
        actor: &ActorRef,
        org_id: &str,
    ) -> impl Future<Output = Result<Vec<RoleAssignment>, StorageError>> + Send;
}

pub trait RoleStore: Send + Sync {
    fn find_role(
        &self,
        scope: &ScopeRef,
        slug: &str,
    ) -> impl Future<Output = Result<Option<CustomRole>, StorageError>> + Send;
}

pub trait ServiceTokenStore: Send + Sync {
    /// Project the token is bound to, or `None` for an unknown token.
    fn service_token_project(
        &self,
        token_id: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;
}
