use warden_core::assignment::RefParseError;
use warden_core::domain::UnknownVariant;
use warden_core::engine::{ResolveError, ScopeMismatch};
use warden_storage::StorageError;

use crate::config::ConfigError;
use crate::fixture::FixtureError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    ScopeMismatch(#[from] ScopeMismatch),

    #[error("invalid query: {0}")]
    InvalidQuery(#[from] UnknownVariant),

    #[error("invalid reference: {0}")]
    InvalidReference(#[from] RefParseError),

    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl ServiceError {
    /// Whether the failure came from the collaborator store rather than the
    /// caller's input.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, ServiceError::Resolve(_) | ServiceError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::domain::ScopeKind;

    #[test]
    fn service_error_from_resolve_error() {
        let err: ServiceError = ResolveError::Store("connection reset".to_string()).into();

        assert!(
            err.to_string().contains("connection reset"),
            "expected 'connection reset' in error message, got: {err}"
        );
        assert!(err.is_store_failure());
    }

    #[test]
    fn service_error_from_scope_mismatch() {
        let err: ServiceError = ScopeMismatch {
            requestor: ScopeKind::Project,
            target: ScopeKind::Organization,
        }
        .into();

        assert_eq!(
            err.to_string(),
            "cannot compare project ability against organization ability"
        );
        assert!(!err.is_store_failure());
    }

    #[test]
    fn service_error_from_unknown_variant() {
        let err: ServiceError = "teleport".parse::<ScopeKind>().unwrap_err().into();

        assert!(err.to_string().contains("teleport"));
    }
}
