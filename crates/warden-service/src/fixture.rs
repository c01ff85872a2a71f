//! JSON fixtures describing roles, grants and service tokens, loaded into an
//! [`InMemoryStore`] for CLI runs and tests.
//!
//! ```json
//! {
//!   "roles": [
//!     { "scope": "project:p1", "name": "Deleters", "slug": "deleters",
//!       "permissions": [["delete", "secrets"]] }
//!   ],
//!   "grants": [
//!     { "actor": "user:alice", "scope": "project:p1", "role": "member" },
//!     { "actor": "user:alice", "scope": "project:p1", "customRole": "deleters",
//!       "temporary": { "end": "2030-01-01T00:00:00Z" } }
//!   ],
//!   "inactiveOrgMemberships": [{ "actor": "user:bob", "orgId": "org-1" }],
//!   "serviceTokens": [{ "id": "st-1", "projectId": "p1" }]
//! }
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use warden_core::assignment::{ActorRef, RefParseError, ScopeRef};
use warden_storage::{InMemoryStore, RoleGrant, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse fixture: {0}")]
    Parse(String),

    #[error("grant {index} names both a built-in and a custom role")]
    AmbiguousGrant { index: usize },

    #[error("grant {index} names no role")]
    MissingRole { index: usize },

    #[error("invalid reference: {0}")]
    Reference(#[from] RefParseError),

    #[error("failed to load fixture into store: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub roles: Vec<FixtureRole>,
    #[serde(default)]
    pub grants: Vec<FixtureGrant>,
    #[serde(default)]
    pub inactive_org_memberships: Vec<FixtureMembership>,
    #[serde(default)]
    pub service_tokens: Vec<FixtureServiceToken>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixtureRole {
    pub scope: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub permissions: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixtureGrant {
    pub actor: String,
    pub scope: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub custom_role: Option<String>,
    #[serde(default)]
    pub temporary: Option<FixtureWindow>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureWindow {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixtureMembership {
    pub actor: String,
    pub org_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixtureServiceToken {
    pub id: String,
    pub project_id: String,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FixtureError::ReadFile(path.display().to_string(), e.to_string()))?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(json).map_err(|e| FixtureError::Parse(e.to_string()))
    }

    /// Writes the fixture into `store`. Roles go first so grants can refer
    /// to them.
    pub fn apply(&self, store: &InMemoryStore) -> Result<(), FixtureError> {
        for role in &self.roles {
            let scope: ScopeRef = role.scope.parse()?;
            store.upsert_role(&scope, &role.name, &role.slug, role.permissions.clone())?;
        }

        for (index, grant) in self.grants.iter().enumerate() {
            let actor: ActorRef = grant.actor.parse()?;
            let scope: ScopeRef = grant.scope.parse()?;
            let mut role_grant = match (&grant.role, &grant.custom_role) {
                (Some(slug), None) => RoleGrant::builtin(slug.as_str()),
                (None, Some(slug)) => RoleGrant::custom(slug.as_str()),
                (Some(_), Some(_)) => return Err(FixtureError::AmbiguousGrant { index }),
                (None, None) => return Err(FixtureError::MissingRole { index }),
            };
            if let Some(window) = &grant.temporary {
                role_grant = role_grant.temporary(window.start, window.end);
            }
            store.grant(&actor, &scope, role_grant)?;
        }

        for membership in &self.inactive_org_memberships {
            let actor: ActorRef = membership.actor.parse()?;
            store.set_org_membership_active(&actor, &membership.org_id, false)?;
        }

        for token in &self.service_tokens {
            store.add_service_token(&token.id, &token.project_id)?;
        }

        tracing::debug!(
            roles = self.roles.len(),
            grants = self.grants.len(),
            service_tokens = self.service_tokens.len(),
            "fixture loaded"
        );
        Ok(())
    }

    pub fn into_store(self) -> Result<InMemoryStore, FixtureError> {
        let store = InMemoryStore::new();
        self.apply(&store)?;
        Ok(store)
    }
}
