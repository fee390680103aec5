//! Durable client-side credential storage.
//!
//! Credentials live in a key/value store under fixed key names so any
//! backend (memory, file, OS keychain) can hold them.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageSettings};
use crate::models::{TenantContext, TokenPair};

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const ORGANIZATION_ID_KEY: &str = "organization_id";
pub const WORKSPACE_ID_KEY: &str = "workspace_id";
pub const ORGANIZATION_ROLE_KEY: &str = "organization_role";
pub const WORKSPACE_ROLE_KEY: &str = "workspace_role";

/// Every key this crate writes. Cleared together on logout.
pub const SESSION_KEYS: [&str; 6] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    ORGANIZATION_ID_KEY,
    WORKSPACE_ID_KEY,
    ORGANIZATION_ROLE_KEY,
    WORKSPACE_ROLE_KEY,
];

const DEFAULT_SESSION_FILE: &str = ".session.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt value for '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Build the configured store.
pub fn from_settings(settings: &StorageSettings) -> Arc<dyn TokenStore> {
    match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryTokenStore::new()),
        StorageBackend::File => {
            let path = settings
                .path
                .clone()
                .unwrap_or_else(|| DEFAULT_SESSION_FILE.into());
            Arc::new(FileTokenStore::new(path))
        }
    }
}

/// Credentials recovered from storage.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub tokens: TokenPair,
    pub context: Option<TenantContext>,
}

pub async fn save_session(
    store: &dyn TokenStore,
    tokens: &TokenPair,
    context: Option<&TenantContext>,
) -> Result<(), StorageError> {
    store
        .set(ACCESS_TOKEN_KEY, tokens.access_token.expose_secret())
        .await?;
    match &tokens.refresh_token {
        Some(refresh) => store.set(REFRESH_TOKEN_KEY, refresh.expose_secret()).await?,
        None => store.remove(REFRESH_TOKEN_KEY).await?,
    }
    save_context(store, context).await
}

async fn save_context(
    store: &dyn TokenStore,
    context: Option<&TenantContext>,
) -> Result<(), StorageError> {
    let organization_id = context.map(|c| c.organization_id.to_string());
    let workspace_id = context.and_then(|c| c.workspace_id).map(|id| id.to_string());
    let organization_role = context.and_then(|c| c.organization_role).map(|r| r.as_str());
    let workspace_role = context.and_then(|c| c.workspace_role).map(|r| r.as_str());

    put_optional(store, ORGANIZATION_ID_KEY, organization_id.as_deref()).await?;
    put_optional(store, WORKSPACE_ID_KEY, workspace_id.as_deref()).await?;
    put_optional(store, ORGANIZATION_ROLE_KEY, organization_role).await?;
    put_optional(store, WORKSPACE_ROLE_KEY, workspace_role).await
}

async fn put_optional(
    store: &dyn TokenStore,
    key: &str,
    value: Option<&str>,
) -> Result<(), StorageError> {
    match value {
        Some(value) => store.set(key, value).await,
        None => store.remove(key).await,
    }
}

/// Load a stored session. Returns `None` when no access token is stored.
pub async fn load_session(store: &dyn TokenStore) -> Result<Option<StoredSession>, StorageError> {
    let Some(access_token) = store.get(ACCESS_TOKEN_KEY).await? else {
        return Ok(None);
    };
    let refresh_token = store.get(REFRESH_TOKEN_KEY).await?;

    let context = match store.get(ORGANIZATION_ID_KEY).await? {
        Some(organization_id) => Some(TenantContext {
            organization_id: parse_uuid(ORGANIZATION_ID_KEY, &organization_id)?,
            workspace_id: store
                .get(WORKSPACE_ID_KEY)
                .await?
                .map(|id| parse_uuid(WORKSPACE_ID_KEY, &id))
                .transpose()?,
            organization_role: parse_optional(store, ORGANIZATION_ROLE_KEY).await?,
            workspace_role: parse_optional(store, WORKSPACE_ROLE_KEY).await?,
        }),
        None => None,
    };

    Ok(Some(StoredSession {
        tokens: TokenPair::new(access_token, refresh_token),
        context,
    }))
}

fn parse_uuid(key: &str, value: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

async fn parse_optional<T>(store: &dyn TokenStore, key: &str) -> Result<Option<T>, StorageError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    store
        .get(key)
        .await?
        .map(|value| {
            value.parse::<T>().map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Remove every session key.
pub async fn clear_session(store: &dyn TokenStore) -> Result<(), StorageError> {
    for key in SESSION_KEYS {
        store.remove(key).await?;
    }
    Ok(())
}
