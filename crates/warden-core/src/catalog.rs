//! Built-in role rule sets.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::ability::{DomainRule, OrgRule, ProjectRule};
use crate::domain::{
    Domain, OrgAction, OrgSubject, PermissionSubject, ProjectAction, ProjectSubject, wire_enum,
};

wire_enum! {
    pub enum ProjectRole ("project role") {
        Admin => "admin",
        Member => "member",
        Viewer => "viewer",
        NoAccess => "no-access",
        CryptographicOperator => "cryptographic-operator",
        SshHostBootstrapper => "ssh-host-bootstrapper",
    }
}

wire_enum! {
    pub enum OrgRole ("organization role") {
        Admin => "admin",
        Member => "member",
        NoAccess => "no-access",
    }
}

static PROJECT_ROLES: LazyLock<HashMap<ProjectRole, Vec<ProjectRule>>> = LazyLock::new(|| {
    ProjectRole::ALL
        .iter()
        .map(|role| (*role, project_rules(*role)))
        .collect()
});

static ORG_ROLES: LazyLock<HashMap<OrgRole, Vec<OrgRule>>> = LazyLock::new(|| {
    OrgRole::ALL
        .iter()
        .map(|role| (*role, org_rules(*role)))
        .collect()
});

pub fn project_role_rules(slug: &str) -> Option<&'static [ProjectRule]> {
    let role = slug.parse::<ProjectRole>().ok()?;
    PROJECT_ROLES.get(&role).map(Vec::as_slice)
}

pub fn org_role_rules(slug: &str) -> Option<&'static [OrgRule]> {
    let role = slug.parse::<OrgRole>().ok()?;
    ORG_ROLES.get(&role).map(Vec::as_slice)
}

/// Rules for a non-custom slug. Unknown slugs grant nothing.
pub fn rules_for<D: Domain>(slug: &str) -> &'static [DomainRule<D>] {
    match D::builtin_rules(slug) {
        Some(rules) => rules,
        None => {
            tracing::warn!(
                role = %slug,
                scope_kind = %D::SCOPE,
                "unknown built-in role slug, granting nothing"
            );
            &[]
        }
    }
}

pub fn is_custom_project_role(slug: &str) -> bool {
    slug.parse::<ProjectRole>().is_err()
}

pub fn is_custom_org_role(slug: &str) -> bool {
    slug.parse::<OrgRole>().is_err()
}

fn project_rules(role: ProjectRole) -> Vec<ProjectRule> {
    use crate::domain::ProjectAction as A;
    use crate::domain::ProjectSubject as S;

    let grant = ProjectRule::grant;
    match role {
        ProjectRole::Admin => S::ALL
            .iter()
            .filter(|s| !s.is_wildcard())
            .map(|s| grant(s.supported_actions(), &[*s]))
            .collect(),
        ProjectRole::Member => vec![
            grant(
                &[
                    A::Read,
                    A::DescribeSecret,
                    A::ReadValue,
                    A::Create,
                    A::Edit,
                    A::Delete,
                ],
                &[S::Secrets],
            ),
            grant(&[A::Read, A::Create, A::Edit, A::Delete], &[S::SecretFolders]),
            grant(
                &[A::Read],
                &[
                    S::SecretImports,
                    S::DynamicSecrets,
                    S::Member,
                    S::Identity,
                    S::Groups,
                    S::Role,
                    S::Integrations,
                    S::Webhooks,
                    S::ServiceTokens,
                    S::Settings,
                    S::Environments,
                    S::Tags,
                    S::AuditLogs,
                    S::IpAllowList,
                    S::CertificateAuthorities,
                    S::Certificates,
                    S::CertificateTemplates,
                ],
            ),
            grant(
                &[A::Read, A::Encrypt, A::Decrypt, A::Sign, A::Verify],
                &[S::Cmek],
            ),
        ],
        ProjectRole::Viewer => vec![
            grant(&[A::DescribeSecret], &[S::Secrets]),
            grant(
                &[A::Read],
                &[
                    S::SecretFolders,
                    S::Member,
                    S::Identity,
                    S::Role,
                    S::Environments,
                    S::Tags,
                    S::Cmek,
                ],
            ),
        ],
        ProjectRole::NoAccess => Vec::new(),
        ProjectRole::CryptographicOperator => vec![grant(
            &[A::Read, A::Encrypt, A::Decrypt, A::Sign, A::Verify],
            &[S::Cmek],
        )],
        ProjectRole::SshHostBootstrapper => vec![grant(
            &[A::Read],
            &[
                S::SshHosts,
                S::SshCertificateAuthorities,
                S::SshCertificateTemplates,
            ],
        )],
    }
}

fn org_rules(role: OrgRole) -> Vec<OrgRule> {
    use crate::domain::OrgAction as A;
    use crate::domain::OrgSubject as S;

    let grant = OrgRule::grant;
    match role {
        OrgRole::Admin => S::ALL
            .iter()
            .filter(|s| !s.is_wildcard())
            .map(|s| grant(s.supported_actions(), &[*s]))
            .collect(),
        OrgRole::Member => vec![
            grant(&[A::Read, A::Create], &[S::Workspace]),
            grant(&[A::Read], &[S::Member, S::Role, S::Groups, S::Identity]),
        ],
        OrgRole::NoAccess => Vec::new(),
    }
}
