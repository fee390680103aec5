//! Shared setup for session-client integration tests.

#![allow(dead_code)]

use session_client::config::ClientSettings;
use session_client::events::SessionEvent;
use session_client::storage::{self, MemoryTokenStore, TokenStore};
use session_client::{SessionManager, TenantContext, TokenPair};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use wiremock::MockServer;

pub const ACCESS_TOKEN: &str = "access-1";
pub const REFRESH_TOKEN: &str = "refresh-1";

pub fn settings(server: &MockServer) -> ClientSettings {
    let mut settings = ClientSettings::new(server.uri());
    settings.timeout_secs = 5;
    settings
}

/// Session without credentials.
pub fn anonymous_session(server: &MockServer) -> (SessionManager, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let session = SessionManager::new(settings(server), store.clone())
        .expect("Failed to build session manager");
    (session, store)
}

/// Session restored from a store seeded with the given credentials.
pub async fn restored_session(
    server: &MockServer,
    access_token: &str,
    refresh_token: Option<&str>,
    context: Option<TenantContext>,
) -> (SessionManager, Arc<MemoryTokenStore>) {
    restored_session_with(settings(server), access_token, refresh_token, context).await
}

pub async fn restored_session_with(
    settings: ClientSettings,
    access_token: &str,
    refresh_token: Option<&str>,
    context: Option<TenantContext>,
) -> (SessionManager, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let tokens = TokenPair::new(
        access_token.to_string(),
        refresh_token.map(str::to_string),
    );
    storage::save_session(store.as_ref(), &tokens, context.as_ref())
        .await
        .expect("Failed to seed store");

    let session = SessionManager::new(settings, store.clone())
        .expect("Failed to build session manager");
    assert!(session.restore().await.expect("Failed to restore session"));
    (session, store)
}

pub async fn stored(store: &MemoryTokenStore, key: &str) -> Option<String> {
    store.get(key).await.expect("Failed to read store")
}

/// Wait for the first event matching `predicate`, skipping others.
pub async fn next_matching<F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    mut predicate: F,
) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("Event channel closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("Timed out waiting for session event")
}
