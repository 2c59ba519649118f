//! REST API client module for the DocSecure backend.
//!
//! This module provides the `ApiClient` for the authenticated document,
//! share and audit endpoints, plus the unauthenticated public share
//! endpoints used by recipients of a link.
//!
//! The API uses JWT bearer token authentication obtained through the
//! form-encoded token endpoint.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
