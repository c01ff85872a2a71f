use std::sync::Arc;

use warden_core::assignment::{ActorRef, CustomRole, RoleAssignment, ScopeRef};
use warden_core::domain::ScopeKind;
use warden_core::engine::{AssignmentReader, ResolveError};
use warden_storage::{MembershipStore, RoleStore, ServiceTokenStore, StorageError};

/// Bridges the persistence traits to the engine's reader interface.
pub struct StoreAssignmentReader<S> {
    store: Arc<S>,
}

impl<S> StoreAssignmentReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

fn to_resolve_error(e: StorageError) -> ResolveError {
    ResolveError::Store(e.to_string())
}

impl<S> AssignmentReader for StoreAssignmentReader<S>
where
    S: MembershipStore + RoleStore + ServiceTokenStore,
{
    async fn read_assignments(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
    ) -> Result<Vec<RoleAssignment>, ResolveError> {
        match scope.kind {
            ScopeKind::Project => self.store.project_memberships(actor, &scope.id).await,
            ScopeKind::Organization => self.store.org_memberships(actor, &scope.id).await,
        }
        .map_err(to_resolve_error)
    }

    async fn read_custom_role(
        &self,
        scope: &ScopeRef,
        slug: &str,
    ) -> Result<Option<CustomRole>, ResolveError> {
        self.store
            .find_role(scope, slug)
            .await
            .map_err(to_resolve_error)
    }

    async fn read_service_token_project(
        &self,
        token_id: &str,
    ) -> Result<Option<String>, ResolveError> {
        self.store
            .service_token_project(token_id)
            .await
            .map_err(to_resolve_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_storage::{InMemoryStore, RoleGrant};

    #[tokio::test]
    async fn adapter_dispatches_on_scope_kind() {
        let store = Arc::new(InMemoryStore::new());
        let alice = ActorRef::user("alice");
        store
            .grant(&alice, &ScopeRef::project("x"), RoleGrant::builtin("viewer"))
            .unwrap();
        store
            .grant(&alice, &ScopeRef::organization("x"), RoleGrant::builtin("member"))
            .unwrap();

        let adapter = StoreAssignmentReader::new(Arc::clone(&store));
        let project = adapter
            .read_assignments(&alice, &ScopeRef::project("x"))
            .await
            .unwrap();
        let org = adapter
            .read_assignments(&alice, &ScopeRef::organization("x"))
            .await
            .unwrap();

        assert_eq!(project[0].role_slug, "viewer");
        assert_eq!(org[0].role_slug, "member");
    }

    #[tokio::test]
    async fn adapter_reads_custom_roles_and_tokens() {
        let store = Arc::new(InMemoryStore::new());
        let scope = ScopeRef::project("p");
        store
            .upsert_role(&scope, "Ops", "ops", Some(json!([["read", "tags"]])))
            .unwrap();
        store.add_service_token("st-1", "p").unwrap();

        let adapter = StoreAssignmentReader::new(Arc::clone(&store));

        let role = adapter.read_custom_role(&scope, "ops").await.unwrap();
        assert_eq!(role.map(|r| r.slug), Some("ops".to_string()));
        assert_eq!(
            adapter.read_service_token_project("st-1").await.unwrap(),
            Some("p".to_string())
        );
    }

    #[test]
    fn storage_errors_become_store_failures() {
        let err = to_resolve_error(StorageError::Unavailable("pool timed out".to_string()));

        assert!(matches!(err, ResolveError::Store(ref msg) if msg.contains("pool timed out")));
    }
}
