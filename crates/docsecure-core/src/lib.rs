//! Core library for the DocSecure terminal client.
//!
//! Everything independent of the terminal UI lives here:
//! - `api`: REST client for the DocSecure backend
//! - `auth`: session persistence, the auth gateway, and screen guarding
//! - `models`: structures mirroring the backend's JSON responses
//! - `config`: on-disk configuration with environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use config::Config;
