//! Authentication module: the session lifecycle and the operations that
//! drive it.
//!
//! This module provides:
//! - `SessionStore`: the persisted credential slot plus the in-memory
//!   `Session` aggregate it keeps consistent
//! - `AuthGateway`: login, registration, and identity fetch, split into a
//!   network phase and an apply phase tied together by a generation counter
//! - `guard`: the per-frame gate deciding whether protected screens render
//! - `CredentialStore`: remembered passwords via the OS keyring
//!
//! Tokens carry their own expiry; validity is re-checked at every use, and
//! an expired or undecodable persisted token is purged on startup.

pub mod credentials;
pub mod gateway;
pub mod guard;
pub mod session;

pub use credentials::CredentialStore;
pub use gateway::{Applied, AuthError, AuthGateway, LoginSuccess};
pub use guard::GuardDecision;
pub use session::{Credential, CredentialError, Restored, Session, SessionStore};
