//! Session notifications for presentation code.
//!
//! Subscribers get a typed `SessionEvent` stream instead of listening for a
//! named global event.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const ACTION_CREATE_ORGANIZATION: &str = "create_organization";

/// Payload broadcast when the backend reports that the user has no usable
/// organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoOrganizationNotice {
    pub error_code: String,
    pub message: String,
    pub action_required: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Tenant selection is invalid; an organization must be created.
    NoOrganization(NoOrganizationNotice),
    /// Credentials were purged; the user must sign in again.
    LoginRequired { reason: String },
    ContextSwitched {
        organization_id: Uuid,
        workspace_id: Option<Uuid>,
    },
    LoggedOut,
}

/// Subscription registry for `SessionEvent`s, one per session.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: SessionEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(?event, "No subscribers for session event");
                0
            }
        }
    }
}
