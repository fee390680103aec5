use reqwest::StatusCode;
use thiserror::Error;

use crate::classifier::{self, ClassifiedError};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or protocol failure. Never retried.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Authentication failure that could not be recovered by a refresh.
    #[error("Unauthorized: {}", .0.message)]
    Unauthorized(ClassifiedError),

    /// Refresh failed or no refresh token was available. Credentials are purged.
    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No active organization")]
    NoActiveOrganization,

    /// Non-success response carrying a classified payload.
    #[error("{}", .0.message)]
    Api(ClassifiedError),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl ApiError {
    pub fn classification(&self) -> Option<&ClassifiedError> {
        match self {
            ApiError::Api(classified) | ApiError::Unauthorized(classified) => Some(classified),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Transport(e) => e.status(),
            other => other.classification().and_then(ClassifiedError::status_code),
        }
    }

    /// True when the backend reported that the tenant selection is invalid.
    pub fn is_no_organization(&self) -> bool {
        self.classification()
            .is_some_and(ClassifiedError::is_no_organization)
    }

    /// Whether this failure ended the session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Human-readable message for presentation code.
    pub fn display_message(&self) -> String {
        match self {
            ApiError::Api(classified) | ApiError::Unauthorized(classified) => {
                classified.message.clone()
            }
            ApiError::Transport(e) => {
                classifier::extract_message(None, None, Some(&e.to_string()))
            }
            other => other.to_string(),
        }
    }
}
