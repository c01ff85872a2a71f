wire_enum! {
    pub enum ProjectAction ("project action") {
        Read => "read",
        Create => "create",
        Edit => "edit",
        Delete => "delete",
        DescribeSecret => "describeSecret",
        ReadValue => "readValue",
        Subscribe => "subscribe",
        GrantPrivileges => "grant-privileges",
        RevokePrivileges => "revoke-privileges",
        Encrypt => "encrypt",
        Decrypt => "decrypt",
        Sign => "sign",
        Verify => "verify",
        ExportPrivateKey => "export-private-key",
        Import => "import",
        IssueCert => "issue-cert",
        SyncCertificates => "sync-certificates",
        SyncSecrets => "sync-secrets",
        ImportSecrets => "import-secrets",
        RemoveSecrets => "remove-secrets",
        IssueHostCert => "issue-host-cert",
        Review => "review",
        Revoke => "revoke",
    }
}

wire_enum! {
    pub enum ProjectSubject ("project subject") {
        All => "all",
        Role => "role",
        Member => "member",
        Groups => "groups",
        Settings => "project-settings",
        Integrations => "integrations",
        Webhooks => "webhooks",
        ServiceTokens => "service-tokens",
        Environments => "environments",
        Tags => "tags",
        AuditLogs => "audit-logs",
        IpAllowList => "ip-allowlist",
        Secrets => "secrets",
        SecretFolders => "secret-folders",
        SecretImports => "secret-imports",
        DynamicSecrets => "dynamic-secrets",
        SecretRollback => "secret-rollback",
        SecretApproval => "secret-approval",
        SecretRotation => "secret-rotation",
        Identity => "identity",
        CertificateAuthorities => "certificate-authorities",
        Certificates => "certificates",
        CertificateTemplates => "certificate-templates",
        PkiAlerts => "pki-alerts",
        PkiCollections => "pki-collections",
        PkiSubscribers => "pki-subscribers",
        PkiSync => "pki-sync",
        PkiTemplates => "pki-templates",
        CertificatePolicy => "certificate-policy",
        CertificateProfile => "certificate-profile",
        Cmek => "cmek",
        SshCertificateAuthorities => "ssh-certificate-authorities",
        SshCertificates => "ssh-certificates",
        SshCertificateTemplates => "ssh-certificate-templates",
        SshHosts => "ssh-hosts",
        SshHostGroups => "ssh-host-groups",
        Commits => "commits",
        SecretSync => "secret-sync",
        AppConnections => "app-connections",
        ApprovalRequests => "approval-requests",
        ApprovalRequestGrants => "approval-request-grants",
    }
}

use ProjectAction as A;

const CRUD: &[ProjectAction] = &[A::Read, A::Create, A::Edit, A::Delete];

const PRIVILEGED_CRUD: &[ProjectAction] = &[
    A::Read,
    A::Create,
    A::Edit,
    A::Delete,
    A::GrantPrivileges,
    A::RevokePrivileges,
];

const SECRET_ACTIONS: &[ProjectAction] = &[
    A::Read,
    A::DescribeSecret,
    A::ReadValue,
    A::Create,
    A::Edit,
    A::Delete,
    A::Subscribe,
];

const CMEK_ACTIONS: &[ProjectAction] = &[
    A::Read,
    A::Create,
    A::Edit,
    A::Delete,
    A::Encrypt,
    A::Decrypt,
    A::Sign,
    A::Verify,
    A::ExportPrivateKey,
];

const CERTIFICATE_ACTIONS: &[ProjectAction] = &[A::Read, A::Create, A::Edit, A::Delete, A::Import];

const PKI_SUBSCRIBER_ACTIONS: &[ProjectAction] =
    &[A::Read, A::Create, A::Edit, A::Delete, A::IssueCert];

const PKI_SYNC_ACTIONS: &[ProjectAction] =
    &[A::Read, A::Create, A::Edit, A::Delete, A::SyncCertificates];

const SECRET_SYNC_ACTIONS: &[ProjectAction] = &[
    A::Read,
    A::Create,
    A::Edit,
    A::Delete,
    A::SyncSecrets,
    A::ImportSecrets,
    A::RemoveSecrets,
];

const SSH_HOST_ACTIONS: &[ProjectAction] =
    &[A::Read, A::Create, A::Edit, A::Delete, A::IssueHostCert];

const APPROVAL_REQUEST_ACTIONS: &[ProjectAction] = &[A::Read, A::Create, A::Review];

const APPROVAL_GRANT_ACTIONS: &[ProjectAction] = &[A::Read, A::Create, A::Revoke];

impl ProjectSubject {
    /// Actions that are meaningful on this subject.
    pub fn supported_actions(&self) -> &'static [ProjectAction] {
        match self {
            ProjectSubject::All => ProjectAction::ALL,
            ProjectSubject::Member | ProjectSubject::Identity | ProjectSubject::Groups => {
                PRIVILEGED_CRUD
            }
            ProjectSubject::Secrets => SECRET_ACTIONS,
            ProjectSubject::Cmek => CMEK_ACTIONS,
            ProjectSubject::Certificates => CERTIFICATE_ACTIONS,
            ProjectSubject::PkiSubscribers => PKI_SUBSCRIBER_ACTIONS,
            ProjectSubject::PkiSync => PKI_SYNC_ACTIONS,
            ProjectSubject::SecretSync => SECRET_SYNC_ACTIONS,
            ProjectSubject::SshHosts => SSH_HOST_ACTIONS,
            ProjectSubject::Commits => &[A::Read],
            ProjectSubject::ApprovalRequests => APPROVAL_REQUEST_ACTIONS,
            ProjectSubject::ApprovalRequestGrants => APPROVAL_GRANT_ACTIONS,
            ProjectSubject::Role
            | ProjectSubject::Settings
            | ProjectSubject::Integrations
            | ProjectSubject::Webhooks
            | ProjectSubject::ServiceTokens
            | ProjectSubject::Environments
            | ProjectSubject::Tags
            | ProjectSubject::AuditLogs
            | ProjectSubject::IpAllowList
            | ProjectSubject::SecretFolders
            | ProjectSubject::SecretImports
            | ProjectSubject::DynamicSecrets
            | ProjectSubject::SecretRollback
            | ProjectSubject::SecretApproval
            | ProjectSubject::SecretRotation
            | ProjectSubject::CertificateAuthorities
            | ProjectSubject::CertificateTemplates
            | ProjectSubject::PkiAlerts
            | ProjectSubject::PkiCollections
            | ProjectSubject::PkiTemplates
            | ProjectSubject::CertificatePolicy
            | ProjectSubject::CertificateProfile
            | ProjectSubject::SshCertificateAuthorities
            | ProjectSubject::SshCertificates
            | ProjectSubject::SshCertificateTemplates
            | ProjectSubject::SshHostGroups
            | ProjectSubject::AppConnections => CRUD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_actions_use_mixed_case_wire_names() {
        assert_eq!(ProjectAction::DescribeSecret.as_str(), "describeSecret");
        assert_eq!(
            "readValue".parse::<ProjectAction>().unwrap(),
            ProjectAction::ReadValue
        );
    }

    #[test]
    fn settings_subject_uses_project_prefixed_name() {
        assert_eq!(ProjectSubject::Settings.to_string(), "project-settings");
        assert!("settings".parse::<ProjectSubject>().is_err());
    }

    #[test]
    fn commits_support_read_only() {
        assert_eq!(ProjectSubject::Commits.supported_actions(), &[A::Read]);
    }

    #[test]
    fn every_concrete_subject_supports_read() {
        for subject in ProjectSubject::ALL {
            assert!(
                subject.supported_actions().contains(&A::Read),
                "{subject} should support read"
            );
        }
    }
}
