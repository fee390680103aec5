//! Authenticated transport shared by every backend call.
//!
//! - Injects the bearer credential at send time
//! - Refreshes once on 401 and replays the original request
//! - Funnels concurrent 401s through a single refresh (single flight)
//! - Reissues credentials atomically on tenant-context switch

pub mod request;
pub mod state;

use authz_core::{derive_permissions, PermissionMap};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classifier::{self, ClassifiedError};
use crate::config::ClientSettings;
use crate::error::ApiError;
use crate::events::{EventBus, SessionEvent};
use crate::models::{
    IssuedSession, RefreshRequest, RefreshResponse, SwitchContextRequest, TenantContext, TokenPair,
};
use crate::observability::metrics;
use crate::observability::TracedClientExt;
use crate::storage::{self, TokenStore};

pub use request::{ApiRequest, ApiResponse, RETRY_MARKER_HEADER};
pub use state::AuthStatus;
use state::SessionState;

pub struct SessionManager {
    client: Client,
    settings: ClientSettings,
    base_url: String,
    state: RwLock<SessionState>,
    /// Held for the whole duration of a refresh.
    refresh_gate: Mutex<()>,
    store: Arc<dyn TokenStore>,
    events: EventBus,
}

impl SessionManager {
    pub fn new(settings: ClientSettings, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|_| ApiError::InvalidBaseUrl(settings.base_url.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            events: EventBus::new(settings.event_capacity),
            settings,
            base_url,
            state: RwLock::new(SessionState::default()),
            refresh_gate: Mutex::new(()),
            store,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> AuthStatus {
        self.state.read().await.status()
    }

    pub async fn tenant_context(&self) -> Option<TenantContext> {
        self.state.read().await.context().cloned()
    }

    /// Permission map for the active tenant context.
    pub async fn permissions(&self) -> PermissionMap {
        let context = self.tenant_context().await;
        derive_permissions(
            context.as_ref().and_then(|c| c.organization_role),
            context
                .as_ref()
                .and_then(TenantContext::effective_workspace_role),
        )
    }

    /// Load credentials from durable storage. Returns whether a session was found.
    pub async fn restore(&self) -> Result<bool, ApiError> {
        let Some(stored) = storage::load_session(self.store.as_ref()).await? else {
            debug!("No stored session");
            return Ok(false);
        };

        let organization_id = stored.context.as_ref().map(|c| c.organization_id);
        self.state.write().await.install(stored.tokens, stored.context);
        info!(?organization_id, "Session restored from storage");
        Ok(true)
    }

    #[tracing::instrument(skip_all)]
    pub async fn login(
        &self,
        email: &str,
        password: &Secret<String>,
    ) -> Result<Option<TenantContext>, ApiError> {
        let request = ApiRequest::post(
            &self.settings.login_path,
            serde_json::json!({
                "email": email,
                "password": password.expose_secret(),
            }),
        );

        let response = self.dispatch(&request, None).await?;
        let issued: IssuedSession = self.into_result(response).await?.json()?;

        let context = issued.context();
        let tokens = TokenPair::new(issued.access_token, issued.refresh_token);

        // Stored first so a storage failure leaves the session unauthenticated
        if let Err(e) = storage::save_session(self.store.as_ref(), &tokens, context.as_ref()).await
        {
            error!(error = %e, "Failed to persist session credentials");
            if let Err(e) = storage::clear_session(self.store.as_ref()).await {
                warn!(error = %e, "Failed to clear partially stored credentials");
            }
            return Err(e.into());
        }
        self.state
            .write()
            .await
            .install(tokens.clone(), context.clone());

        info!(
            organization_id = ?context.as_ref().map(|c| c.organization_id),
            "Session established"
        );
        Ok(context)
    }

    /// Revoke the session server-side (best effort) and purge local credentials.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let (access_token, refresh_token) = {
            let state = self.state.read().await;
            (state.access_token().cloned(), state.refresh_token().cloned())
        };

        if let Some(refresh_token) = refresh_token {
            let request = ApiRequest::post(
                &self.settings.logout_path,
                serde_json::json!({ "refresh_token": refresh_token.expose_secret() }),
            );
            // Local state is purged whatever the backend answers
            match self.dispatch(&request, access_token.as_ref()).await {
                Ok(response) if response.status().is_success() => info!("Session revoked"),
                Ok(response) => {
                    warn!(status = %response.status(), "Backend rejected session revocation")
                }
                Err(e) => warn!(error = %e, "Failed to revoke session during logout"),
            }
        }

        self.state.write().await.purge();
        storage::clear_session(self.store.as_ref()).await?;
        self.events.publish(SessionEvent::LoggedOut);
        info!("Logged out");
        Ok(())
    }

    pub async fn switch_organization(&self, organization_id: Uuid) -> Result<TenantContext, ApiError> {
        self.switch_context(&self.settings.switch_organization_path, organization_id, None)
            .await
    }

    /// Switch workspace inside the active organization.
    pub async fn switch_workspace(&self, workspace_id: Uuid) -> Result<TenantContext, ApiError> {
        let organization_id = self
            .tenant_context()
            .await
            .map(|c| c.organization_id)
            .ok_or(ApiError::NoActiveOrganization)?;

        self.switch_context(
            &self.settings.switch_workspace_path,
            organization_id,
            Some(workspace_id),
        )
        .await
    }

    /// Ask the backend for a credential scoped to the new context, then
    /// install credential and context together. On failure nothing changes.
    #[tracing::instrument(skip(self, path))]
    async fn switch_context(
        &self,
        path: &str,
        organization_id: Uuid,
        workspace_id: Option<Uuid>,
    ) -> Result<TenantContext, ApiError> {
        if self.state().await == AuthStatus::Unauthenticated {
            return Err(ApiError::NotAuthenticated);
        }

        let body = serde_json::to_value(SwitchContextRequest {
            organization_id,
            workspace_id,
        })?;
        let issued = match self
            .execute(ApiRequest::post(path, body))
            .await
            .and_then(|response| response.json::<IssuedSession>())
        {
            Ok(issued) => issued,
            Err(e) => {
                metrics::record_context_switch("failure");
                warn!(error = %e, "Context switch failed, keeping previous context");
                return Err(e);
            }
        };

        let (tokens, context) = {
            let mut state = self.state.write().await;
            let tokens = match state.tokens() {
                Some(current) => current.rotated(issued.access_token, issued.refresh_token),
                None => {
                    // Session ended while the switch was in flight
                    metrics::record_context_switch("failure");
                    return Err(ApiError::SessionExpired);
                }
            };

            let organization_id = issued.organization_id.unwrap_or(organization_id);
            let workspace_id = issued.workspace_id.or(workspace_id);
            let organization_role = issued.organization_role.or_else(|| {
                state
                    .context()
                    .filter(|previous| previous.organization_id == organization_id)
                    .and_then(|previous| previous.organization_role)
            });
            let context = TenantContext {
                organization_id,
                workspace_id,
                organization_role,
                workspace_role: workspace_id.and(issued.workspace_role),
            };

            state.install(tokens.clone(), Some(context.clone()));
            (tokens, context)
        };

        self.persist(&tokens, Some(&context)).await;
        metrics::record_context_switch("success");
        info!(
            organization_id = %context.organization_id,
            workspace_id = ?context.workspace_id,
            "Tenant context switched"
        );
        self.events.publish(SessionEvent::ContextSwitched {
            organization_id: context.organization_id,
            workspace_id: context.workspace_id,
        });
        Ok(context)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(ApiRequest::get(path)).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::post(path, body)).await?.json()
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::put(path, body)).await?.json()
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::patch(path, body)).await?.json()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(ApiRequest::delete(path)).await?.json()
    }

    /// Send a request with the current credential.
    ///
    /// On 401 the request is replayed once after a refresh. A request already
    /// marked as retried, or sent without a credential, surfaces its 401
    /// without refreshing.
    #[tracing::instrument(
        skip_all,
        fields(
            method = %request.method,
            path = %request.path,
            request_id = %request.request_id(),
        )
    )]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let snapshot = self.state.read().await.snapshot();
        let response = self
            .dispatch(&request, snapshot.access_token.as_ref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return self.into_result(response).await;
        }

        // Every 401 is classified, including the one that triggers a refresh
        let classified = self.reject(response).await;

        if request.is_retried() {
            warn!("Replayed request was rejected again, not refreshing");
            return Err(ApiError::Unauthorized(classified));
        }

        if snapshot.access_token.is_none() {
            debug!("Anonymous request rejected, nothing to refresh");
            return Err(ApiError::Unauthorized(classified));
        }

        debug!(generation = snapshot.generation, "Access token rejected");
        let access_token = self.refresh_after(snapshot.generation).await?;

        let replay = request.mark_retried();
        let response = self.dispatch(&replay, Some(&access_token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Replayed request was rejected with a fresh credential");
            return Err(ApiError::Unauthorized(self.reject(response).await));
        }

        self.into_result(response).await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        access_token: Option<&Secret<String>>,
    ) -> Result<Response, ApiError> {
        let url = self.url(&request.path);

        let mut traced = self
            .client
            .traced_request(request.method.clone(), &url)
            .header(CONTENT_TYPE.as_str(), "application/json");
        if !request.query.is_empty() {
            traced = traced.query(&request.query);
        }
        if let Some(body) = &request.body {
            traced = traced.json(body);
        }
        if let Some(token) = access_token {
            traced = traced.bearer_auth(token.expose_secret());
        }
        if request.is_retried() {
            traced = traced.header(RETRY_MARKER_HEADER, "1");
        }

        let response = traced
            .send_with_request_id(request.request_id())
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to send request");
                ApiError::Transport(e)
            })?;

        metrics::record_request(request.method.as_str(), response.status().as_u16());
        Ok(response)
    }

    async fn into_result(&self, response: Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(self.reject(response).await));
        }
        if !status.is_success() {
            return Err(ApiError::Api(self.reject(response).await));
        }

        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }

    /// Classify a failure and broadcast a no-organization condition.
    async fn reject(&self, response: Response) -> ClassifiedError {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status = %status, error = %e, "Failed to read error response body");
                String::new()
            }
        };

        let classified = classifier::classify(status, &body);
        metrics::record_classified_error(classified.error_code.as_deref());

        match classified.no_organization_notice() {
            Some(notice) => {
                warn!(
                    error_code = %notice.error_code,
                    "Backend reported no usable organization"
                );
                self.events.publish(SessionEvent::NoOrganization(notice));
            }
            None => debug!(
                status = %status,
                error_code = ?classified.error_code,
                message = %classified.message,
                "Request failed"
            ),
        }

        classified
    }

    /// Single-flight refresh for the credential generation a request saw.
    ///
    /// Callers queue on the gate. Whoever finds the generation already moved
    /// on takes the current credential (or the expiry) without refreshing.
    async fn refresh_after(&self, seen_generation: u64) -> Result<Secret<String>, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        let refresh_token = {
            let state = self.state.read().await;
            if state.generation() != seen_generation {
                debug!("Credential already replaced, reusing it");
                return state
                    .access_token()
                    .cloned()
                    .ok_or(ApiError::SessionExpired);
            }
            state.refresh_token().cloned()
        };

        let Some(refresh_token) = refresh_token else {
            self.expire_session(seen_generation, "no refresh token available")
                .await;
            return Err(ApiError::SessionExpired);
        };

        let refreshed = match self.request_refresh(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                metrics::record_refresh("failure");
                warn!(error = %e, "Token refresh failed");
                self.expire_session(seen_generation, "token refresh failed")
                    .await;
                return Err(ApiError::SessionExpired);
            }
        };

        let (tokens, context) = {
            let mut state = self.state.write().await;
            if state.generation() != seen_generation {
                // Logout or context switch landed while refreshing
                return state
                    .access_token()
                    .cloned()
                    .ok_or(ApiError::SessionExpired);
            }
            let tokens = match state.tokens() {
                Some(current) => current.rotated(refreshed.access_token, refreshed.refresh_token),
                None => return Err(ApiError::SessionExpired),
            };
            state.rotate(tokens.clone());
            (tokens, state.context().cloned())
        };

        metrics::record_refresh("success");
        info!("Access token refreshed");
        self.persist(&tokens, context.as_ref()).await;
        Ok(tokens.access_token)
    }

    async fn request_refresh(
        &self,
        refresh_token: &Secret<String>,
    ) -> Result<RefreshResponse, ApiError> {
        let url = self.url(&self.settings.refresh_path);

        let response = self
            .client
            .traced_post(&url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send_with_request_id(&Uuid::new_v4().to_string())
            .await?;

        let status = response.status();
        metrics::record_request("POST", status.as_u16());
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ApiError::Unauthorized(classifier::classify(status, &body)));
        }

        Ok(response.json::<RefreshResponse>().await?)
    }

    /// Purge credentials and ask presentation code to sign in again, unless
    /// the credential generation already moved on.
    async fn expire_session(&self, seen_generation: u64, reason: &str) {
        {
            let mut state = self.state.write().await;
            if state.generation() != seen_generation {
                return;
            }
            state.purge();
        }

        if let Err(e) = storage::clear_session(self.store.as_ref()).await {
            error!(error = %e, "Failed to clear stored credentials");
        }
        warn!(reason, "Session expired, credentials purged");
        self.events.publish(SessionEvent::LoginRequired {
            reason: reason.to_string(),
        });
    }

    /// Mirror the in-memory session to durable storage.
    async fn persist(&self, tokens: &TokenPair, context: Option<&TenantContext>) {
        if let Err(e) = storage::save_session(self.store.as_ref(), tokens, context).await {
            error!(error = %e, "Failed to persist session credentials");
        }
    }
}
