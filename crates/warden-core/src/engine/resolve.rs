use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ability::{Ability, DomainAbility, OrgAbility, ProjectAbility, decode_rules};
use crate::assignment::{ActorRef, ActorType, ScopeRef};
use crate::catalog::rules_for;
use crate::domain::{
    Domain, OrgAction, OrgDomain, OrgSubject, ProjectAction, ProjectDomain, ProjectSubject,
    ScopeKind,
};

use super::compose::build_ability;
use super::{AssignmentReader, ResolveError, ScopedAbility};

const SERVICE_TOKEN_ROLE: &str = "admin";

/// Identity of the role an ability was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleInfo {
    pub id: Option<String>,
    pub name: String,
    pub slug: String,
}

/// One entry of a role-based resolution. `role` is `None` when the slug
/// could not be turned into rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleAbility<A, S> {
    pub role: Option<RoleInfo>,
    pub ability: Ability<A, S>,
}

/// Turns an actor and a scope into an ability, reading memberships through
/// the supplied reader on every call.
pub struct PermissionResolver<R: AssignmentReader> {
    reader: Arc<R>,
}

impl<R: AssignmentReader> PermissionResolver<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    pub async fn resolve(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
    ) -> Result<ScopedAbility, ResolveError> {
        self.resolve_at(actor, scope, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
        now: DateTime<Utc>,
    ) -> Result<ScopedAbility, ResolveError> {
        Ok(match scope.kind {
            ScopeKind::Organization => {
                ScopedAbility::Organization(self.resolve_org_at(actor, &scope.id, now).await?)
            }
            ScopeKind::Project => {
                ScopedAbility::Project(self.resolve_project_at(actor, &scope.id, now).await?)
            }
        })
    }

    pub async fn resolve_project(
        &self,
        actor: &ActorRef,
        project_id: &str,
    ) -> Result<ProjectAbility, ResolveError> {
        self.resolve_project_at(actor, project_id, Utc::now()).await
    }

    pub async fn resolve_project_at(
        &self,
        actor: &ActorRef,
        project_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProjectAbility, ResolveError> {
        self.resolve_in::<ProjectDomain>(actor, project_id, now).await
    }

    pub async fn resolve_org(
        &self,
        actor: &ActorRef,
        org_id: &str,
    ) -> Result<OrgAbility, ResolveError> {
        self.resolve_org_at(actor, org_id, Utc::now()).await
    }

    pub async fn resolve_org_at(
        &self,
        actor: &ActorRef,
        org_id: &str,
        now: DateTime<Utc>,
    ) -> Result<OrgAbility, ResolveError> {
        self.resolve_in::<OrgDomain>(actor, org_id, now).await
    }

    async fn resolve_in<D: Domain>(
        &self,
        actor: &ActorRef,
        scope_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DomainAbility<D>, ResolveError> {
        let scope = ScopeRef::new(D::SCOPE, scope_id);

        if actor.actor_type == ActorType::Service {
            return self.resolve_service_token::<D>(actor, &scope).await;
        }

        let rows = self.reader.read_assignments(actor, &scope).await?;
        let ability = build_ability::<D>(&rows, now);

        tracing::debug!(
            actor = %actor,
            scope = %scope,
            assignments = rows.len(),
            rules = ability.len(),
            "resolved ability"
        );

        Ok(ability)
    }

    async fn resolve_service_token<D: Domain>(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
    ) -> Result<DomainAbility<D>, ResolveError> {
        if D::SCOPE != ScopeKind::Project {
            return Ok(Ability::empty());
        }

        let bound_project = self
            .reader
            .read_service_token_project(&actor.actor_id)
            .await?;

        match bound_project {
            Some(project_id) if project_id == scope.id => {
                Ok(Ability::new(rules_for::<D>(SERVICE_TOKEN_ROLE).to_vec()))
            }
            _ => {
                tracing::debug!(
                    token = %actor.actor_id,
                    scope = %scope,
                    "service token is not bound to scope"
                );
                Ok(Ability::empty())
            }
        }
    }

    /// Builds one ability per role slug without consulting memberships.
    ///
    /// Built-in slugs come from the catalog. Other slugs are looked up as
    /// custom roles of `scope_id` when one is given.
    pub async fn resolve_by_roles<D: Domain>(
        &self,
        slugs: &[String],
        scope_id: Option<&str>,
    ) -> Result<Vec<RoleAbility<D::Action, D::Subject>>, ResolveError> {
        let mut results = Vec::with_capacity(slugs.len());

        for slug in slugs {
            if let Some(rules) = D::builtin_rules(slug) {
                results.push(RoleAbility {
                    role: Some(RoleInfo {
                        id: None,
                        name: slug.clone(),
                        slug: slug.clone(),
                    }),
                    ability: Ability::new(rules.to_vec()),
                });
                continue;
            }

            let resolved = match scope_id {
                Some(id) => self.custom_role_ability::<D>(id, slug).await?,
                None => None,
            };

            results.push(resolved.unwrap_or_else(|| {
                tracing::warn!(role = %slug, scope_kind = %D::SCOPE, "role could not be resolved");
                RoleAbility {
                    role: None,
                    ability: Ability::empty(),
                }
            }));
        }

        Ok(results)
    }

    pub async fn resolve_project_roles(
        &self,
        slugs: &[String],
        project_id: Option<&str>,
    ) -> Result<Vec<RoleAbility<ProjectAction, ProjectSubject>>, ResolveError> {
        self.resolve_by_roles::<ProjectDomain>(slugs, project_id).await
    }

    pub async fn resolve_org_roles(
        &self,
        slugs: &[String],
        org_id: Option<&str>,
    ) -> Result<Vec<RoleAbility<OrgAction, OrgSubject>>, ResolveError> {
        self.resolve_by_roles::<OrgDomain>(slugs, org_id).await
    }

    async fn custom_role_ability<D: Domain>(
        &self,
        scope_id: &str,
        slug: &str,
    ) -> Result<Option<RoleAbility<D::Action, D::Subject>>, ResolveError> {
        let scope = ScopeRef::new(D::SCOPE, scope_id);
        let Some(role) = self.reader.read_custom_role(&scope, slug).await? else {
            return Ok(None);
        };
        let Some(blob) = &role.permissions else {
            tracing::error!(role = %slug, scope = %scope, "custom role has no permissions");
            return Ok(None);
        };

        match decode_rules(blob) {
            Ok(rules) => Ok(Some(RoleAbility {
                role: Some(RoleInfo {
                    id: Some(role.id.clone()),
                    name: role.name.clone(),
                    slug: role.slug.clone(),
                }),
                ability: Ability::new(rules),
            })),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    role = %slug,
                    scope = %scope,
                    "failed to decode custom role permissions"
                );
                Ok(None)
            }
        }
    }
}
