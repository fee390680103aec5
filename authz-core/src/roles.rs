//! Organization and workspace roles.
//!
//! Both enums are declared lowest-privilege first so the derived `Ord`
//! matches the role hierarchy (`owner > admin > member`,
//! `admin > editor > viewer`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleParseError {
    #[error("unknown organization role '{0}'")]
    Organization(String),

    #[error("unknown workspace role '{0}'")]
    Workspace(String),
}

/// Tenant-level role. Exactly one per (user, organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationRole {
    Member,
    Admin,
    Owner,
}

impl OrganizationRole {
    pub const ALL: [OrganizationRole; 3] = [
        OrganizationRole::Owner,
        OrganizationRole::Admin,
        OrganizationRole::Member,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationRole::Owner => "owner",
            OrganizationRole::Admin => "admin",
            OrganizationRole::Member => "member",
        }
    }
}

impl fmt::Display for OrganizationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizationRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(OrganizationRole::Owner),
            "admin" => Ok(OrganizationRole::Admin),
            "member" => Ok(OrganizationRole::Member),
            other => Err(RoleParseError::Organization(other.to_string())),
        }
    }
}

/// Sub-tenant role. Only meaningful while a workspace is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Viewer,
    Editor,
    Admin,
}

impl WorkspaceRole {
    pub const ALL: [WorkspaceRole; 3] = [
        WorkspaceRole::Admin,
        WorkspaceRole::Editor,
        WorkspaceRole::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceRole::Admin => "admin",
            WorkspaceRole::Editor => "editor",
            WorkspaceRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(WorkspaceRole::Admin),
            "editor" => Ok(WorkspaceRole::Editor),
            "viewer" => Ok(WorkspaceRole::Viewer),
            other => Err(RoleParseError::Workspace(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_role_ordering() {
        assert!(OrganizationRole::Owner > OrganizationRole::Admin);
        assert!(OrganizationRole::Admin > OrganizationRole::Member);
    }

    #[test]
    fn test_workspace_role_ordering() {
        assert!(WorkspaceRole::Admin > WorkspaceRole::Editor);
        assert!(WorkspaceRole::Editor > WorkspaceRole::Viewer);
    }

    #[test]
    fn test_parse_roles() {
        assert_eq!("owner".parse::<OrganizationRole>(), Ok(OrganizationRole::Owner));
        assert_eq!("editor".parse::<WorkspaceRole>(), Ok(WorkspaceRole::Editor));
        assert_eq!(
            "superuser".parse::<OrganizationRole>(),
            Err(RoleParseError::Organization("superuser".to_string()))
        );
        // Organization-only role names are not workspace roles.
        assert!("owner".parse::<WorkspaceRole>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let role: WorkspaceRole = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, WorkspaceRole::Viewer);
        assert_eq!(
            serde_json::to_string(&OrganizationRole::Admin).unwrap(),
            "\"admin\""
        );
    }
}
