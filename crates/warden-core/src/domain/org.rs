wire_enum! {
    pub enum OrgAction ("organization action") {
        Read => "read",
        Create => "create",
        Edit => "edit",
        Delete => "delete",
        GrantPrivileges => "grant-privileges",
        RevokePrivileges => "revoke-privileges",
        AddMembers => "add-members",
        RemoveMembers => "remove-members",
        AccessAllProjects => "access-all-projects",
        ListGateways => "list-gateways",
        CreateGateways => "create-gateways",
        DeleteGateways => "delete-gateways",
        EditGateways => "edit-gateways",
        AttachGateways => "attach-gateways",
        ManageSettings => "manage-settings",
    }
}

wire_enum! {
    pub enum OrgSubject ("organization subject") {
        All => "all",
        Workspace => "workspace",
        Role => "role",
        Member => "member",
        Settings => "settings",
        IncidentAccount => "incident-account",
        Sso => "sso",
        Scim => "scim",
        Ldap => "ldap",
        Groups => "groups",
        SecretScanning => "secret-scanning",
        Billing => "billing",
        Identity => "identity",
        Kms => "kms",
        AuditLogs => "audit-logs",
        AppConnections => "app-connections",
        Gateway => "gateway",
        AdminConsole => "admin-console",
        SecretShare => "secret-share",
        SubOrg => "sub-org",
        MachineIdentityAuthTemplates => "machine-identity-auth-templates",
    }
}

const CRUD: &[OrgAction] = &[
    OrgAction::Read,
    OrgAction::Create,
    OrgAction::Edit,
    OrgAction::Delete,
];

const IDENTITY_ACTIONS: &[OrgAction] = &[
    OrgAction::Read,
    OrgAction::Create,
    OrgAction::Edit,
    OrgAction::Delete,
    OrgAction::GrantPrivileges,
    OrgAction::RevokePrivileges,
];

const GROUP_ACTIONS: &[OrgAction] = &[
    OrgAction::Read,
    OrgAction::Create,
    OrgAction::Edit,
    OrgAction::Delete,
    OrgAction::AddMembers,
    OrgAction::RemoveMembers,
    OrgAction::GrantPrivileges,
    OrgAction::RevokePrivileges,
];

const GATEWAY_ACTIONS: &[OrgAction] = &[
    OrgAction::ListGateways,
    OrgAction::CreateGateways,
    OrgAction::DeleteGateways,
    OrgAction::EditGateways,
    OrgAction::AttachGateways,
];

impl OrgSubject {
    pub fn supported_actions(&self) -> &'static [OrgAction] {
        match self {
            OrgSubject::All => OrgAction::ALL,
            OrgSubject::Identity => IDENTITY_ACTIONS,
            OrgSubject::Groups => GROUP_ACTIONS,
            OrgSubject::Gateway => GATEWAY_ACTIONS,
            OrgSubject::AdminConsole => &[OrgAction::AccessAllProjects],
            OrgSubject::SecretShare => &[OrgAction::ManageSettings],
            OrgSubject::SubOrg => &[OrgAction::Create],
            OrgSubject::Workspace
            | OrgSubject::Role
            | OrgSubject::Member
            | OrgSubject::Settings
            | OrgSubject::IncidentAccount
            | OrgSubject::Sso
            | OrgSubject::Scim
            | OrgSubject::Ldap
            | OrgSubject::SecretScanning
            | OrgSubject::Billing
            | OrgSubject::Kms
            | OrgSubject::AuditLogs
            | OrgSubject::AppConnections
            | OrgSubject::MachineIdentityAuthTemplates => CRUD,
        }
    }
}
