use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use warden_core::ability::encode_rules;
use warden_core::assignment::{ActorRef, ScopeRef};
use warden_core::catalog::{OrgRole, ProjectRole, org_role_rules, project_role_rules};
use warden_core::domain::ScopeKind;
use warden_core::engine::BoundaryResult;
use warden_storage::InMemoryStore;

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::fixture::Fixture;
use crate::metrics::Metrics;
use crate::service::PermissionService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub actor: String,
    pub scope: String,
    pub action: String,
    pub subject: String,
    pub allowed: bool,
}

fn service_for_fixture(
    fixture: &Path,
    config: &AppConfig,
    metrics: &Arc<Metrics>,
) -> Result<PermissionService<InMemoryStore>, ServiceError> {
    let store = Fixture::load(fixture)?.into_store()?;
    Ok(PermissionService::from_config(
        Arc::new(store),
        config,
        Arc::clone(metrics),
    ))
}

pub async fn check(
    config: &AppConfig,
    metrics: &Arc<Metrics>,
    fixture: &Path,
    actor: &ActorRef,
    scope: &ScopeRef,
    action: &str,
    subject: &str,
    instance: Option<&str>,
) -> Result<CheckOutcome, ServiceError> {
    let instance: Option<Value> = instance
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| ServiceError::InvalidInstance(e.to_string()))?;

    let service = service_for_fixture(fixture, config, metrics)?;
    let allowed = service
        .can(actor, scope, action, subject, instance.as_ref())
        .await?;

    Ok(CheckOutcome {
        actor: actor.to_string(),
        scope: scope.to_string(),
        action: action.to_string(),
        subject: subject.to_string(),
        allowed,
    })
}

pub async fn boundary(
    config: &AppConfig,
    metrics: &Arc<Metrics>,
    fixture: &Path,
    scope: &ScopeRef,
    requestor: &ActorRef,
    target: &ActorRef,
) -> Result<BoundaryResult, ServiceError> {
    let service = service_for_fixture(fixture, config, metrics)?;
    service
        .validate_actor_privilege_change(requestor, target, scope)
        .await
}

/// The built-in catalog as `{ kind: { slug: packedRules } }`.
pub fn roles(kind: Option<ScopeKind>) -> Value {
    let mut out = serde_json::Map::new();

    if kind.is_none_or(|k| k == ScopeKind::Project) {
        let roles: serde_json::Map<String, Value> = ProjectRole::ALL
            .iter()
            .map(|role| {
                let rules = project_role_rules(role.as_str()).unwrap_or_default();
                (role.as_str().to_string(), encode_rules(rules))
            })
            .collect();
        out.insert(ScopeKind::Project.to_string(), Value::Object(roles));
    }

    if kind.is_none_or(|k| k == ScopeKind::Organization) {
        let roles: serde_json::Map<String, Value> = OrgRole::ALL
            .iter()
            .map(|role| {
                let rules = org_role_rules(role.as_str()).unwrap_or_default();
                (role.as_str().to_string(), encode_rules(rules))
            })
            .collect();
        out.insert(ScopeKind::Organization.to_string(), Value::Object(roles));
    }

    Value::Object(out)
}

pub fn render(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string())
}
