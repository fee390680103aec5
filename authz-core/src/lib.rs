//! authz-core: derives the UI-facing permission map from a user's
//! organization and workspace roles.
//!
//! The backend stays the enforcement point. This crate mirrors its policy so
//! clients can gate actions without a round trip.

pub mod permissions;
pub mod policy;
pub mod roles;

pub use permissions::{has, has_all, has_any, PermissionMap};
pub use policy::{derive_permissions, RoleTiers, Rule, Tier, POLICY};
pub use roles::{OrganizationRole, RoleParseError, WorkspaceRole};
