//! Static permission policy.
//!
//! Every catalog key maps to the set of role tiers that grant it. A key is
//! granted when the user holds any one of its tiers. Keys are never computed
//! from other keys, so evaluation order does not matter.

use crate::permissions::PermissionMap;
use crate::roles::{OrganizationRole, WorkspaceRole};

/// Permission catalog shared with the backend's enforcement layer.
pub mod keys {
    pub const ORG_VIEW: &str = "org:view";
    pub const ORG_EDIT: &str = "org:edit";
    pub const ORG_DELETE: &str = "org:delete";
    pub const ORG_BILLING: &str = "org:billing";
    pub const ORG_SETTINGS: &str = "org:settings";
    pub const ORG_MEMBERS_VIEW: &str = "org:members:view";
    pub const ORG_MEMBERS_INVITE: &str = "org:members:invite";
    pub const ORG_MEMBERS_REMOVE: &str = "org:members:remove";
    pub const ORG_MEMBERS_ROLE: &str = "org:members:role";

    pub const WORKSPACE_CREATE: &str = "workspace:create";
    pub const WORKSPACE_VIEW: &str = "workspace:view";
    pub const WORKSPACE_WRITE: &str = "workspace:write";
    pub const WORKSPACE_DELETE: &str = "workspace:delete";
    pub const WORKSPACE_MEMBERS_VIEW: &str = "workspace:members:view";
    pub const WORKSPACE_MEMBERS_MANAGE: &str = "workspace:members:manage";

    pub const CHATBOT_VIEW: &str = "chatbot:view";
    pub const CHATBOT_CREATE: &str = "chatbot:create";
    pub const CHATBOT_EDIT: &str = "chatbot:edit";
    pub const CHATBOT_DELETE: &str = "chatbot:delete";

    pub const CHATFLOW_VIEW: &str = "chatflow:view";
    pub const CHATFLOW_CREATE: &str = "chatflow:create";
    pub const CHATFLOW_EDIT: &str = "chatflow:edit";
    pub const CHATFLOW_DELETE: &str = "chatflow:delete";

    pub const DOCUMENT_VIEW: &str = "document:view";
    pub const DOCUMENT_CREATE: &str = "document:create";
    pub const DOCUMENT_EDIT: &str = "document:edit";
    pub const DOCUMENT_DELETE: &str = "document:delete";

    pub const CREDENTIAL_VIEW: &str = "credential:view";
    pub const CREDENTIAL_CREATE: &str = "credential:create";
    pub const CREDENTIAL_EDIT: &str = "credential:edit";
    pub const CREDENTIAL_DELETE: &str = "credential:delete";

    pub const ANALYTICS_VIEW: &str = "analytics:view";
}

/// A single boolean derived from the role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    OrgOwner,
    OrgAdmin,
    OrgMember,
    WorkspaceAdmin,
    WorkspaceEditor,
    WorkspaceViewer,
}

/// Role tiers computed along both role hierarchies.
///
/// Higher roles imply every lower tier: an owner is also admin and member,
/// a workspace admin is also editor and viewer. Workspace tiers are only set
/// when a workspace role is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleTiers {
    pub org_owner: bool,
    pub org_admin: bool,
    pub org_member: bool,
    pub workspace_admin: bool,
    pub workspace_editor: bool,
    pub workspace_viewer: bool,
}

impl RoleTiers {
    pub fn from_roles(
        organization_role: Option<OrganizationRole>,
        workspace_role: Option<WorkspaceRole>,
    ) -> Self {
        let Some(org) = organization_role else {
            return Self::default();
        };
        let workspace_at_least = |min: WorkspaceRole| workspace_role.is_some_and(|w| w >= min);

        Self {
            org_owner: org >= OrganizationRole::Owner,
            org_admin: org >= OrganizationRole::Admin,
            org_member: org >= OrganizationRole::Member,
            workspace_admin: workspace_at_least(WorkspaceRole::Admin),
            workspace_editor: workspace_at_least(WorkspaceRole::Editor),
            workspace_viewer: workspace_at_least(WorkspaceRole::Viewer),
        }
    }

    pub fn holds(&self, tier: Tier) -> bool {
        match tier {
            Tier::OrgOwner => self.org_owner,
            Tier::OrgAdmin => self.org_admin,
            Tier::OrgMember => self.org_member,
            Tier::WorkspaceAdmin => self.workspace_admin,
            Tier::WorkspaceEditor => self.workspace_editor,
            Tier::WorkspaceViewer => self.workspace_viewer,
        }
    }
}

/// Policy row: `key` is granted when any tier in `any_of` holds.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub key: &'static str,
    pub any_of: &'static [Tier],
}

impl Rule {
    pub fn evaluate(&self, tiers: &RoleTiers) -> bool {
        self.any_of.iter().any(|tier| tiers.holds(*tier))
    }
}

const fn rule(key: &'static str, any_of: &'static [Tier]) -> Rule {
    Rule { key, any_of }
}

use keys::*;
use Tier::*;

const OWNER: &[Tier] = &[OrgOwner];
const ORG_ADMIN: &[Tier] = &[OrgAdmin];
const ORG_MEMBER: &[Tier] = &[OrgMember];
const ORG_ADMIN_OR_VIEWER: &[Tier] = &[OrgAdmin, WorkspaceViewer];
const ORG_ADMIN_OR_WS_ADMIN: &[Tier] = &[OrgAdmin, WorkspaceAdmin];
const WS_VIEWER: &[Tier] = &[WorkspaceViewer];
const WS_EDITOR: &[Tier] = &[WorkspaceEditor];

/// The full policy matrix, one row per catalog key.
pub const POLICY: &[Rule] = &[
    // organization
    rule(ORG_VIEW, ORG_MEMBER),
    rule(ORG_EDIT, ORG_ADMIN),
    rule(ORG_DELETE, OWNER),
    rule(ORG_BILLING, OWNER),
    rule(ORG_SETTINGS, ORG_ADMIN),
    rule(ORG_MEMBERS_VIEW, ORG_MEMBER),
    rule(ORG_MEMBERS_INVITE, ORG_ADMIN),
    rule(ORG_MEMBERS_REMOVE, ORG_ADMIN),
    rule(ORG_MEMBERS_ROLE, OWNER),
    // workspace
    rule(WORKSPACE_CREATE, ORG_ADMIN),
    rule(WORKSPACE_VIEW, ORG_ADMIN_OR_VIEWER),
    rule(WORKSPACE_WRITE, ORG_ADMIN_OR_WS_ADMIN),
    rule(WORKSPACE_DELETE, ORG_ADMIN),
    rule(WORKSPACE_MEMBERS_VIEW, ORG_ADMIN_OR_VIEWER),
    rule(WORKSPACE_MEMBERS_MANAGE, ORG_ADMIN_OR_WS_ADMIN),
    // chatbots
    rule(CHATBOT_VIEW, ORG_ADMIN_OR_VIEWER),
    rule(CHATBOT_CREATE, WS_VIEWER),
    rule(CHATBOT_EDIT, WS_EDITOR),
    rule(CHATBOT_DELETE, ORG_ADMIN_OR_WS_ADMIN),
    // chatflows: creation needs editor, unlike the other resource kinds
    rule(CHATFLOW_VIEW, ORG_ADMIN_OR_VIEWER),
    rule(CHATFLOW_CREATE, WS_EDITOR),
    rule(CHATFLOW_EDIT, WS_EDITOR),
    rule(CHATFLOW_DELETE, ORG_ADMIN_OR_WS_ADMIN),
    // documents
    rule(DOCUMENT_VIEW, ORG_ADMIN_OR_VIEWER),
    rule(DOCUMENT_CREATE, WS_VIEWER),
    rule(DOCUMENT_EDIT, WS_EDITOR),
    rule(DOCUMENT_DELETE, ORG_ADMIN_OR_WS_ADMIN),
    // credentials
    rule(CREDENTIAL_VIEW, ORG_ADMIN_OR_VIEWER),
    rule(CREDENTIAL_CREATE, WS_VIEWER),
    rule(CREDENTIAL_EDIT, WS_EDITOR),
    rule(CREDENTIAL_DELETE, ORG_ADMIN_OR_WS_ADMIN),
    // analytics
    rule(ANALYTICS_VIEW, ORG_ADMIN_OR_VIEWER),
];

/// Derive the permission map for a role assignment.
///
/// - No IO
/// - No mutation of inputs
/// - Absent organization role yields every key `false`
pub fn derive_permissions(
    organization_role: Option<OrganizationRole>,
    workspace_role: Option<WorkspaceRole>,
) -> PermissionMap {
    let tiers = RoleTiers::from_roles(organization_role, workspace_role);

    POLICY
        .iter()
        .map(|rule| (rule.key, rule.evaluate(&tiers)))
        .collect()
}
