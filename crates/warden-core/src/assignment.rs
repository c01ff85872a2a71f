use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ScopeKind, UnknownVariant, wire_enum};

/// Role slug that marks an assignment as carrying its own rule blob.
pub const CUSTOM_ROLE_SLUG: &str = "custom";

wire_enum! {
    pub enum ActorType ("actor type") {
        User => "user",
        Identity => "identity",
        Service => "service",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefParseError {
    #[error("expected '<type>:<id>', got '{0}'")]
    MissingSeparator(String),

    #[error("identifier must not be empty in '{0}'")]
    EmptyId(String),

    #[error(transparent)]
    UnknownType(#[from] UnknownVariant),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRef {
    pub actor_type: ActorType,
    pub actor_id: String,
}

impl ActorRef {
    pub fn new(actor_type: ActorType, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type,
            actor_id: actor_id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(ActorType::User, id)
    }

    pub fn identity(id: impl Into<String>) -> Self {
        Self::new(ActorType::Identity, id)
    }

    pub fn service(id: impl Into<String>) -> Self {
        Self::new(ActorType::Service, id)
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.actor_type, self.actor_id)
    }
}

impl FromStr for ActorRef {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = split_ref(s)?;
        Ok(Self::new(kind.parse()?, id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeRef {
    pub kind: ScopeKind,
    pub id: String,
}

impl ScopeRef {
    pub fn new(kind: ScopeKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self::new(ScopeKind::Project, id)
    }

    pub fn organization(id: impl Into<String>) -> Self {
        Self::new(ScopeKind::Organization, id)
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for ScopeRef {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = split_ref(s)?;
        Ok(Self::new(kind.parse()?, id))
    }
}

fn split_ref(s: &str) -> Result<(&str, &str), RefParseError> {
    let (kind, id) = s
        .split_once(':')
        .ok_or_else(|| RefParseError::MissingSeparator(s.to_string()))?;
    if id.is_empty() {
        return Err(RefParseError::EmptyId(s.to_string()));
    }
    Ok((kind, id))
}

/// One role held by an actor in a scope, as read from the membership store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub role_slug: String,
    pub scope_id: String,
    #[serde(default)]
    pub permissions: Option<Value>,
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default)]
    pub temporary_access_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub temporary_access_end_time: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    pub fn builtin(role_slug: impl Into<String>, scope_id: impl Into<String>) -> Self {
        Self {
            role_slug: role_slug.into(),
            scope_id: scope_id.into(),
            permissions: None,
            is_temporary: false,
            temporary_access_start_time: None,
            temporary_access_end_time: None,
        }
    }

    pub fn custom(scope_id: impl Into<String>, permissions: Value) -> Self {
        Self {
            permissions: Some(permissions),
            ..Self::builtin(CUSTOM_ROLE_SLUG, scope_id)
        }
    }

    /// Marks the assignment as time-boxed. A `None` end leaves it inactive.
    pub fn temporary(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.is_temporary = true;
        self.temporary_access_start_time = start;
        self.temporary_access_end_time = end;
        self
    }

    pub fn is_custom(&self) -> bool {
        self.role_slug == CUSTOM_ROLE_SLUG
    }
}

/// A named custom role defined in a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRole {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub permissions: Option<Value>,
}
