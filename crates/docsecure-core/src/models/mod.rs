//! Data models for DocSecure entities.
//!
//! This module contains the structures mirroring the backend's JSON
//! schemas (all snake_case on the wire, so no field renaming is needed):
//!
//! - `User`: the authenticated principal
//! - `Document`: stored document metadata
//! - `ShareLink`, `SharedDocumentInfo`: share links and their public view
//! - `AuditLog` plus the `ActionFilter`/`ResourceFilter` view filters

pub mod audit;
pub mod document;
pub mod share;
pub mod user;

pub use audit::{ActionFilter, AuditFilter, AuditLog, ResourceFilter};
pub use document::Document;
pub use share::{ShareLink, SharedDocumentInfo};
pub use user::User;
