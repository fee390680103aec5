//! Tenant-aware HTTP session client.
//!
//! [`SessionManager`] owns the credential pair and the active tenant context,
//! injects the bearer token into every backend call, recovers from expired
//! access tokens with a single shared refresh, and reports backend failures
//! through [`ApiError`] and the [`SessionEvent`] channel.

pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod observability;
pub mod session;
pub mod storage;

pub use authz_core::{OrganizationRole, PermissionMap, WorkspaceRole};
pub use classifier::ClassifiedError;
pub use error::ApiError;
pub use events::{EventBus, NoOrganizationNotice, SessionEvent};
pub use models::{IssuedSession, TenantContext, TokenPair};
pub use session::{ApiRequest, ApiResponse, AuthStatus, SessionManager};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
