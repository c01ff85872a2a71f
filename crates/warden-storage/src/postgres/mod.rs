pub mod migrations;
mod queries;

use serde_json::Value;
use sqlx::PgPool;

use warden_core::assignment::{ActorRef, ActorType, CustomRole, RoleAssignment, ScopeRef};

use crate::traits::{MembershipStore, RoleGrant, RoleStore, ServiceTokenStore, StorageError};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(url)
            .await
            .map_err(queries::to_storage_error)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        migrations::run_migrations(&self.pool)
            .await
            .map_err(queries::to_storage_error)?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    pub async fn upsert_role(
        &self,
        scope: &ScopeRef,
        name: &str,
        slug: &str,
        permissions: Option<&Value>,
    ) -> Result<String, StorageError> {
        queries::upsert_role(&self.pool, scope, name, slug, permissions).await
    }

    pub async fn grant(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
        grant: RoleGrant,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(queries::to_storage_error)?;

        let custom_role_id = match &grant.custom_role {
            Some(slug) => Some(
                queries::find_role(&mut *tx, scope, slug)
                    .await?
                    .map(|r| r.id)
                    .ok_or_else(|| StorageError::NotFound(format!("role '{slug}' in {scope}")))?,
            ),
            None => None,
        };

        let membership_id = queries::ensure_membership(&mut *tx, actor, scope).await?;
        queries::insert_membership_role(
            &mut *tx,
            scope.kind,
            &membership_id,
            &grant,
            custom_role_id.as_deref(),
        )
        .await?;

        tx.commit().await.map_err(queries::to_storage_error)?;
        tracing::debug!(actor = %actor, scope = %scope, role = %grant.role, "role granted");
        Ok(())
    }

    pub async fn set_org_membership_active(
        &self,
        actor: &ActorRef,
        org_id: &str,
        active: bool,
    ) -> Result<(), StorageError> {
        let updated = queries::set_org_membership_active(&self.pool, actor, org_id, active).await?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!(
                "{actor} has no membership in organization '{org_id}'"
            )));
        }
        Ok(())
    }

    pub async fn add_service_token(
        &self,
        token_id: &str,
        project_id: &str,
    ) -> Result<(), StorageError> {
        queries::upsert_service_token(&self.pool, token_id, project_id).await
    }
}

impl MembershipStore for PostgresStore {
    async fn project_memberships(
        &self,
        actor: &ActorRef,
        project_id: &str,
    ) -> Result<Vec<RoleAssignment>, StorageError> {
        if actor.actor_type == ActorType::Service {
            return Ok(Vec::new());
        }
        queries::read_assignments(&self.pool, actor, &ScopeRef::project(project_id)).await
    }

    async fn org_memberships(
        &self,
        actor: &ActorRef,
        org_id: &str,
    ) -> Result<Vec<RoleAssignment>, StorageError> {
        if actor.actor_type == ActorType::Service {
            return Ok(Vec::new());
        }
        queries::read_assignments(&self.pool, actor, &ScopeRef::organization(org_id)).await
    }
}

impl RoleStore for PostgresStore {
    async fn find_role(
        &self,
        scope: &ScopeRef,
        slug: &str,
    ) -> Result<Option<CustomRole>, StorageError> {
        queries::find_role(&self.pool, scope, slug).await
    }
}

impl ServiceTokenStore for PostgresStore {
    async fn service_token_project(&self, token_id: &str) -> Result<Option<String>, StorageError> {
        queries::service_token_project(&self.pool, token_id).await
    }
}
