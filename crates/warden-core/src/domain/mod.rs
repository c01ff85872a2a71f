use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ability::Rule;

/// Declares a closed enum whose variants each map to one wire string.
///
/// Generates `ALL`, `as_str`, `Display`, `FromStr` and string-based serde
/// impls so the enum can cross the JSON boundary without a stringly-typed
/// representation leaking inwards.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($kind:literal) {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::domain::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err($crate::domain::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<Ser: ::serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use wire_enum;

mod org;
mod project;

pub use org::{OrgAction, OrgSubject};
pub use project::{ProjectAction, ProjectSubject};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

wire_enum! {
    pub enum ScopeKind ("scope kind") {
        Organization => "organization",
        Project => "project",
    }
}

pub trait PermissionAction:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = UnknownVariant>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

pub trait PermissionSubject:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = UnknownVariant>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Subject that stands for every subject of the domain.
    const WILDCARD: Self;

    fn is_wildcard(&self) -> bool {
        *self == Self::WILDCARD
    }
}

/// One independent permission universe: its action and subject enums plus
/// its built-in role catalog.
pub trait Domain: Send + Sync + 'static {
    type Action: PermissionAction;
    type Subject: PermissionSubject;

    const SCOPE: ScopeKind;

    fn builtin_rules(slug: &str) -> Option<&'static [Rule<Self::Action, Self::Subject>]>;
}

#[derive(Debug)]
pub enum ProjectDomain {}

#[derive(Debug)]
pub enum OrgDomain {}

impl PermissionAction for ProjectAction {}

impl PermissionSubject for ProjectSubject {
    const WILDCARD: Self = ProjectSubject::All;
}

impl PermissionAction for OrgAction {}

impl PermissionSubject for OrgSubject {
    const WILDCARD: Self = OrgSubject::All;
}

impl Domain for ProjectDomain {
    type Action = ProjectAction;
    type Subject = ProjectSubject;

    const SCOPE: ScopeKind = ScopeKind::Project;

    fn builtin_rules(slug: &str) -> Option<&'static [Rule<ProjectAction, ProjectSubject>]> {
        crate::catalog::project_role_rules(slug)
    }
}

impl Domain for OrgDomain {
    type Action = OrgAction;
    type Subject = OrgSubject;

    const SCOPE: ScopeKind = ScopeKind::Organization;

    fn builtin_rules(slug: &str) -> Option<&'static [Rule<OrgAction, OrgSubject>]> {
        crate::catalog::org_role_rules(slug)
    }
}
