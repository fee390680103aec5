//! Session credential and tenant-context types plus the auth endpoint DTOs.

use authz_core::{OrganizationRole, WorkspaceRole};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access/refresh credential pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: Secret<String>,
    pub refresh_token: Option<Secret<String>>,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Secret::new(access_token),
            refresh_token: refresh_token.map(Secret::new),
        }
    }

    /// Replace the access token, rotating the refresh token only when the
    /// server issued a new one.
    pub fn rotated(&self, access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Secret::new(access_token),
            refresh_token: refresh_token
                .map(Secret::new)
                .or_else(|| self.refresh_token.clone()),
        }
    }
}

/// Active organization and workspace selection with the user's roles there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub organization_id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub organization_role: Option<OrganizationRole>,
    pub workspace_role: Option<WorkspaceRole>,
}

impl TenantContext {
    /// Workspace role, only while a workspace is selected.
    pub fn effective_workspace_role(&self) -> Option<WorkspaceRole> {
        self.workspace_id.and(self.workspace_role)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SwitchContextRequest {
    pub organization_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<Uuid>,
}

/// Token issuance response shared by login and context switch endpoints.
#[derive(Debug, Deserialize)]
pub struct IssuedSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub workspace_id: Option<Uuid>,
    #[serde(default)]
    pub organization_role: Option<OrganizationRole>,
    #[serde(default)]
    pub workspace_role: Option<WorkspaceRole>,
}

impl IssuedSession {
    /// Tenant context described by this response, if it names an organization.
    pub fn context(&self) -> Option<TenantContext> {
        self.organization_id.map(|organization_id| TenantContext {
            organization_id,
            workspace_id: self.workspace_id,
            organization_role: self.organization_role,
            workspace_role: self.workspace_id.and(self.workspace_role),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_rotation_keeps_refresh_token_when_absent() {
        let pair = TokenPair::new("a1".to_string(), Some("r1".to_string()));
        let rotated = pair.rotated("a2".to_string(), None);
        assert_eq!(rotated.access_token.expose_secret(), "a2");
        assert_eq!(
            rotated.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("r1")
        );
    }

    #[test]
    fn test_rotation_replaces_refresh_token_when_issued() {
        let pair = TokenPair::new("a1".to_string(), Some("r1".to_string()));
        let rotated = pair.rotated("a2".to_string(), Some("r2".to_string()));
        assert_eq!(
            rotated.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("r2")
        );
    }

    #[test]
    fn test_issued_session_context() {
        let issued: IssuedSession = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "organization_id": "6f1c2c1e-54a4-4c1f-9d0a-0c8b8b2f4d11",
            "organization_role": "admin",
            "workspace_role": "editor"
        }))
        .unwrap();

        let context = issued.context().unwrap();
        assert_eq!(context.organization_role, Some(OrganizationRole::Admin));
        // No workspace selected, so the workspace role is dropped.
        assert_eq!(context.workspace_role, None);
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let pair = TokenPair::new("super-secret".to_string(), None);
        assert!(!format!("{:?}", pair).contains("super-secret"));
    }
}
