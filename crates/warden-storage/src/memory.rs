use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use warden_core::assignment::{ActorRef, ActorType, CustomRole, RoleAssignment, ScopeRef};
use warden_core::domain::ScopeKind;

use crate::traits::{MembershipStore, RoleGrant, RoleStore, ServiceTokenStore, StorageError};

#[derive(Debug, Clone)]
struct StoredRole {
    id: String,
    scope: ScopeRef,
    name: String,
    slug: String,
    permissions: Option<Value>,
}

impl StoredRole {
    fn to_custom_role(&self) -> CustomRole {
        CustomRole {
            id: self.id.clone(),
            name: self.name.clone(),
            slug: self.slug.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredGrant {
    actor: ActorRef,
    scope: ScopeRef,
    role: String,
    custom_role_id: Option<String>,
    is_temporary: bool,
    temporary_access_start_time: Option<DateTime<Utc>>,
    temporary_access_end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct InnerState {
    roles: Vec<StoredRole>,
    grants: Vec<StoredGrant>,
    inactive: HashSet<(ActorRef, String)>,
    service_tokens: HashMap<String, String>,
}

impl InnerState {
    fn assignments(&self, actor: &ActorRef, scope: &ScopeRef) -> Vec<RoleAssignment> {
        self.grants
            .iter()
            .filter(|g| g.actor == *actor && g.scope == *scope)
            .map(|g| RoleAssignment {
                role_slug: g.role.clone(),
                scope_id: scope.id.clone(),
                permissions: g.custom_role_id.as_ref().and_then(|id| {
                    self.roles
                        .iter()
                        .find(|r| r.id == *id && r.scope == *scope)
                        .and_then(|r| r.permissions.clone())
                }),
                is_temporary: g.is_temporary,
                temporary_access_start_time: g.temporary_access_start_time,
                temporary_access_end_time: g.temporary_access_end_time,
            })
            .collect()
    }
}

/// Process-local store used by tests and fixture-driven CLI runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InnerState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Internal("in-memory store lock poisoned".to_string()))
    }

    /// Creates or replaces a custom role, returning its id.
    pub fn upsert_role(
        &self,
        scope: &ScopeRef,
        name: &str,
        slug: &str,
        permissions: Option<Value>,
    ) -> Result<String, StorageError> {
        let mut state = self.lock()?;

        if let Some(existing) = state
            .roles
            .iter_mut()
            .find(|r| r.scope == *scope && r.slug == slug)
        {
            existing.name = name.to_string();
            existing.permissions = permissions;
            return Ok(existing.id.clone());
        }

        let id = Uuid::new_v4().to_string();
        state.roles.push(StoredRole {
            id: id.clone(),
            scope: scope.clone(),
            name: name.to_string(),
            slug: slug.to_string(),
            permissions,
        });
        Ok(id)
    }

    pub fn delete_role(&self, scope: &ScopeRef, slug: &str) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        let before = state.roles.len();
        state.roles.retain(|r| !(r.scope == *scope && r.slug == slug));
        Ok(state.roles.len() != before)
    }

    pub fn grant(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
        grant: RoleGrant,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;

        let custom_role_id = match &grant.custom_role {
            Some(slug) => Some(
                state
                    .roles
                    .iter()
                    .find(|r| r.scope == *scope && r.slug == *slug)
                    .map(|r| r.id.clone())
                    .ok_or_else(|| StorageError::NotFound(format!("role '{slug}' in {scope}")))?,
            ),
            None => None,
        };

        state.grants.push(StoredGrant {
            actor: actor.clone(),
            scope: scope.clone(),
            role: grant.role,
            custom_role_id,
            is_temporary: grant.is_temporary,
            temporary_access_start_time: grant.temporary_access_start_time,
            temporary_access_end_time: grant.temporary_access_end_time,
        });
        Ok(())
    }

    /// Removes every grant of `role` (a built-in slug or custom role slug)
    /// held by the actor in the scope. Returns how many were removed.
    pub fn revoke(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
        role: &str,
    ) -> Result<usize, StorageError> {
        let mut state = self.lock()?;
        let custom_ids: Vec<String> = state
            .roles
            .iter()
            .filter(|r| r.scope == *scope && r.slug == role)
            .map(|r| r.id.clone())
            .collect();

        let before = state.grants.len();
        state.grants.retain(|g| {
            let matches_role = match &g.custom_role_id {
                Some(id) => custom_ids.contains(id),
                None => g.role == role,
            };
            !(g.actor == *actor && g.scope == *scope && matches_role)
        });
        Ok(before - state.grants.len())
    }

    pub fn set_org_membership_active(
        &self,
        actor: &ActorRef,
        org_id: &str,
        active: bool,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let key = (actor.clone(), org_id.to_string());
        if active {
            state.inactive.remove(&key);
        } else {
            state.inactive.insert(key);
        }
        Ok(())
    }

    pub fn add_service_token(&self, token_id: &str, project_id: &str) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .service_tokens
            .insert(token_id.to_string(), project_id.to_string());
        Ok(())
    }
}

impl MembershipStore for InMemoryStore {
    async fn project_memberships(
        &self,
        actor: &ActorRef,
        project_id: &str,
    ) -> Result<Vec<RoleAssignment>, StorageError> {
        if actor.actor_type == ActorType::Service {
            return Ok(Vec::new());
        }
        let state = self.lock()?;
        Ok(state.assignments(actor, &ScopeRef::project(project_id)))
    }

    async fn org_memberships(
        &self,
        actor: &ActorRef,
        org_id: &str,
    ) -> Result<Vec<RoleAssignment>, StorageError> {
        if actor.actor_type == ActorType::Service {
            return Ok(Vec::new());
        }
        let state = self.lock()?;
        if state
            .inactive
            .contains(&(actor.clone(), org_id.to_string()))
        {
            return Ok(Vec::new());
        }
        Ok(state.assignments(actor, &ScopeRef::organization(org_id)))
    }
}

impl RoleStore for InMemoryStore {
    async fn find_role(
        &self,
        scope: &ScopeRef,
        slug: &str,
    ) -> Result<Option<CustomRole>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .roles
            .iter()
            .find(|r| r.scope == *scope && r.slug == slug)
            .map(StoredRole::to_custom_role))
    }
}

impl ServiceTokenStore for InMemoryStore {
    async fn service_token_project(&self, token_id: &str) -> Result<Option<String>, StorageError> {
        let state = self.lock()?;
        Ok(state.service_tokens.get(token_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use warden_core::assignment::CUSTOM_ROLE_SLUG;
    use serde_json::json;

    fn alice() -> ActorRef {
        ActorRef::user("alice")
    }

    #[tokio::test]
    async fn actor_without_membership_gets_empty_list() {
        let store = InMemoryStore::new();

        let rows = store.project_memberships(&alice(), "proj-1").await.unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn multiple_roles_in_one_scope_are_all_returned_in_grant_order() {
        let store = InMemoryStore::new();
        let scope = ScopeRef::project("proj-1");
        store
            .upsert_role(&scope, "Deleters", "deleters", Some(json!([["delete", "secrets"]])))
            .unwrap();
        store.grant(&alice(), &scope, RoleGrant::builtin("member")).unwrap();
        store.grant(&alice(), &scope, RoleGrant::custom("deleters")).unwrap();

        let rows = store.project_memberships(&alice(), "proj-1").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role_slug, "member");
        assert!(rows[0].permissions.is_none());
        assert_eq!(rows[1].role_slug, CUSTOM_ROLE_SLUG);
        assert_eq!(rows[1].permissions, Some(json!([["delete", "secrets"]])));
    }

    #[tokio::test]
    async fn memberships_are_scoped_by_kind_and_id() {
        let store = InMemoryStore::new();
        store
            .grant(&alice(), &ScopeRef::project("x"), RoleGrant::builtin("admin"))
            .unwrap();

        assert!(store.org_memberships(&alice(), "x").await.unwrap().is_empty());
        assert!(store.project_memberships(&alice(), "y").await.unwrap().is_empty());
        assert!(
            store
                .project_memberships(&ActorRef::identity("alice"), "x")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn temporary_metadata_is_carried_through() {
        let store = InMemoryStore::new();
        let end = Utc::now() + Duration::hours(1);
        store
            .grant(
                &alice(),
                &ScopeRef::project("p"),
                RoleGrant::builtin("viewer").temporary(None, Some(end)),
            )
            .unwrap();

        let rows = store.project_memberships(&alice(), "p").await.unwrap();

        assert!(rows[0].is_temporary);
        assert_eq!(rows[0].temporary_access_end_time, Some(end));
    }

    #[tokio::test]
    async fn role_update_is_visible_to_existing_grants() {
        let store = InMemoryStore::new();
        let scope = ScopeRef::project("p");
        let first = store
            .upsert_role(&scope, "Ops", "ops", Some(json!([["read", "tags"]])))
            .unwrap();
        store.grant(&alice(), &scope, RoleGrant::custom("ops")).unwrap();

        let second = store
            .upsert_role(&scope, "Ops", "ops", Some(json!([["edit", "tags"]])))
            .unwrap();
        let rows = store.project_memberships(&alice(), "p").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(rows[0].permissions, Some(json!([["edit", "tags"]])));
    }

    #[tokio::test]
    async fn deleted_custom_role_leaves_row_without_permissions() {
        let store = InMemoryStore::new();
        let scope = ScopeRef::project("p");
        store
            .upsert_role(&scope, "Ops", "ops", Some(json!([["read", "tags"]])))
            .unwrap();
        store.grant(&alice(), &scope, RoleGrant::custom("ops")).unwrap();
        assert!(store.delete_role(&scope, "ops").unwrap());

        let rows = store.project_memberships(&alice(), "p").await.unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].permissions.is_none());
    }

    #[tokio::test]
    async fn granting_unknown_custom_role_fails() {
        let store = InMemoryStore::new();

        let err = store
            .grant(&alice(), &ScopeRef::project("p"), RoleGrant::custom("ghost"))
            .unwrap_err();

        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn revoke_removes_builtin_and_custom_grants() {
        let store = InMemoryStore::new();
        let scope = ScopeRef::project("p");
        store.upsert_role(&scope, "Ops", "ops", None).unwrap();
        store.grant(&alice(), &scope, RoleGrant::builtin("viewer")).unwrap();
        store.grant(&alice(), &scope, RoleGrant::custom("ops")).unwrap();

        assert_eq!(store.revoke(&alice(), &scope, "ops").unwrap(), 1);
        assert_eq!(store.revoke(&alice(), &scope, "viewer").unwrap(), 1);
        assert_eq!(store.revoke(&alice(), &scope, "viewer").unwrap(), 0);
        assert!(store.project_memberships(&alice(), "p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inactive_org_membership_is_hidden() {
        let store = InMemoryStore::new();
        store
            .grant(&alice(), &ScopeRef::organization("org"), RoleGrant::builtin("admin"))
            .unwrap();

        store.set_org_membership_active(&alice(), "org", false).unwrap();
        assert!(store.org_memberships(&alice(), "org").await.unwrap().is_empty());

        store.set_org_membership_active(&alice(), "org", true).unwrap();
        assert_eq!(store.org_memberships(&alice(), "org").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn service_tokens_map_to_projects() {
        let store = InMemoryStore::new();
        store.add_service_token("st-1", "proj-1").unwrap();

        assert_eq!(
            store.service_token_project("st-1").await.unwrap().as_deref(),
            Some("proj-1")
        );
        assert!(store.service_token_project("st-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_role_is_scoped() {
        let store = InMemoryStore::new();
        store
            .upsert_role(&ScopeRef::organization("org"), "Auditors", "auditors", None)
            .unwrap();

        let found = store
            .find_role(&ScopeRef::organization("org"), "auditors")
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.name), Some("Auditors".to_string()));
        assert!(
            store
                .find_role(&ScopeRef::project("org"), "auditors")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn poisoned_lock_maps_to_internal_error() {
        let store = InMemoryStore::new();
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison");
        })
        .join();

        let err = store.project_memberships(&alice(), "p").await.unwrap_err();
        assert!(matches!(err, StorageError::Internal(_)));
    }
}
