use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use warden_core::ability::{OrgAbility, ProjectAbility};
use warden_core::assignment::{ActorRef, ScopeRef};
use warden_core::domain::{OrgAction, OrgSubject, ProjectAction, ProjectSubject};
use warden_core::engine::{
    BoundaryResult, PermissionResolver, ResolveError, RoleAbility, ScopedAbility,
    check_scoped_boundary, has_secret_read_value_or_describe,
};
use warden_storage::{MembershipStore, RoleStore, ServiceTokenStore};

use crate::adapter::StoreAssignmentReader;
use crate::audit;
use crate::cache::CachingReader;
use crate::config::{AppConfig, CacheSettings};
use crate::error::ServiceError;
use crate::metrics::Metrics;

type Reader<S> = CachingReader<StoreAssignmentReader<S>>;

/// Resolution, evaluation and privilege-change checks over one store.
pub struct PermissionService<S>
where
    S: MembershipStore + RoleStore + ServiceTokenStore,
{
    resolver: PermissionResolver<Reader<S>>,
    enforce_privilege_boundary: bool,
    metrics: Arc<Metrics>,
}

impl<S> PermissionService<S>
where
    S: MembershipStore + RoleStore + ServiceTokenStore,
{
    pub fn new(store: Arc<S>, enforce_privilege_boundary: bool, cache: &CacheSettings) -> Self {
        Self::with_metrics(
            store,
            enforce_privilege_boundary,
            cache,
            Arc::new(Metrics::new()),
        )
    }

    pub fn with_metrics(
        store: Arc<S>,
        enforce_privilege_boundary: bool,
        cache: &CacheSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        let reader = CachingReader::new(StoreAssignmentReader::new(store), cache)
            .with_metrics(Arc::clone(&metrics));
        Self {
            resolver: PermissionResolver::new(Arc::new(reader)),
            enforce_privilege_boundary,
            metrics,
        }
    }

    pub fn from_config(store: Arc<S>, config: &AppConfig, metrics: Arc<Metrics>) -> Self {
        Self::with_metrics(
            store,
            config.engine.enforce_privilege_boundary,
            &config.cache,
            metrics,
        )
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn enforces_privilege_boundary(&self) -> bool {
        self.enforce_privilege_boundary
    }

    pub fn store(&self) -> &Arc<S> {
        self.resolver.reader().inner().store()
    }

    pub async fn resolve(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
    ) -> Result<ScopedAbility, ServiceError> {
        self.resolve_at(actor, scope, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
        now: DateTime<Utc>,
    ) -> Result<ScopedAbility, ServiceError> {
        let result = self.resolver.resolve_at(actor, scope, now).await;
        self.observe(scope, result)
    }

    pub async fn resolve_project(
        &self,
        actor: &ActorRef,
        project_id: &str,
    ) -> Result<ProjectAbility, ServiceError> {
        let result = self.resolver.resolve_project(actor, project_id).await;
        self.observe(&ScopeRef::project(project_id), result)
    }

    pub async fn resolve_org(
        &self,
        actor: &ActorRef,
        org_id: &str,
    ) -> Result<OrgAbility, ServiceError> {
        let result = self.resolver.resolve_org(actor, org_id).await;
        self.observe(&ScopeRef::organization(org_id), result)
    }

    pub async fn project_roles(
        &self,
        slugs: &[String],
        project_id: Option<&str>,
    ) -> Result<Vec<RoleAbility<ProjectAction, ProjectSubject>>, ServiceError> {
        let result = self.resolver.resolve_project_roles(slugs, project_id).await;
        // Without a scope id only the catalog is consulted, so nothing can fail.
        self.observe(&ScopeRef::project(project_id.unwrap_or_default()), result)
    }

    pub async fn org_roles(
        &self,
        slugs: &[String],
        org_id: Option<&str>,
    ) -> Result<Vec<RoleAbility<OrgAction, OrgSubject>>, ServiceError> {
        let result = self.resolver.resolve_org_roles(slugs, org_id).await;
        self.observe(&ScopeRef::organization(org_id.unwrap_or_default()), result)
    }

    /// Resolves the actor and evaluates one query given as wire strings.
    pub async fn can(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
        action: &str,
        subject: &str,
        instance: Option<&Value>,
    ) -> Result<bool, ServiceError> {
        let ability = self.resolve(actor, scope).await?;
        Ok(ability.can_named(action, subject, instance)?)
    }

    pub async fn can_read_secret_value(
        &self,
        actor: &ActorRef,
        project_id: &str,
        instance: Option<&Value>,
    ) -> Result<bool, ServiceError> {
        let ability = self.resolve_project(actor, project_id).await?;
        Ok(has_secret_read_value_or_describe(&ability, instance))
    }

    /// Checks that `requestor` holds every permission in `target`, with the
    /// deployment's enforcement setting.
    pub fn validate_privilege_change(
        &self,
        requestor: &ScopedAbility,
        target: &ScopedAbility,
    ) -> Result<BoundaryResult, ServiceError> {
        let enforced = self.enforce_privilege_boundary;
        let result = check_scoped_boundary(requestor, target, enforced)?;

        self.metrics.record_boundary_check(result.is_valid);
        audit::audit_boundary_check(
            requestor.kind(),
            requestor.rule_count(),
            target.rule_count(),
            enforced,
            &result,
        );

        Ok(result)
    }

    /// Resolves both actors in `scope` and checks whether `requestor` may
    /// hand out everything `target` holds.
    pub async fn validate_actor_privilege_change(
        &self,
        requestor: &ActorRef,
        target: &ActorRef,
        scope: &ScopeRef,
    ) -> Result<BoundaryResult, ServiceError> {
        let requestor_ability = self.resolve(requestor, scope).await?;
        let target_ability = self.resolve(target, scope).await?;
        self.validate_privilege_change(&requestor_ability, &target_ability)
    }

    /// Forgets cached memberships of the scope; call after any membership
    /// or custom-role change in it.
    pub fn invalidate_scope(&self, scope: &ScopeRef) {
        self.resolver.reader().invalidate_scope(scope);
    }

    pub fn invalidate_actor(&self, actor: &ActorRef) {
        self.resolver.reader().invalidate_actor(actor);
    }

    fn observe<T>(&self, scope: &ScopeRef, result: Result<T, ResolveError>) -> Result<T, ServiceError> {
        match result {
            Ok(value) => {
                self.metrics.record_resolution();
                Ok(value)
            }
            Err(e) => {
                self.metrics.record_store_failure();
                audit::audit_store_failure(scope, &e.to_string());
                Err(e.into())
            }
        }
    }
}
