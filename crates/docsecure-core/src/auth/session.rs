//! Session state and the persisted credential slot.
//!
//! One credential at a time: the raw bearer token lives in a single file
//! under the app cache directory, and the in-memory `Session` aggregate is
//! kept consistent with it. Tokens carry their own expiry claim; validity
//! is re-checked against the clock at every use, never cached.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::User;

/// Credential file name in the cache directory.
/// Holds the raw bearer token string and nothing else.
const CREDENTIAL_FILE: &str = "credential.jwt";

/// Claims this client reads from a bearer token.
/// Everything else in the payload is opaque to it.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    /// The token does not parse as a JWT, or lacks an expiry claim
    #[error("Malformed bearer token: {0}")]
    Malformed(String),

    /// The token parsed but its expiry is not in the future
    #[error("Bearer token expired at {0}")]
    Expired(DateTime<Utc>),
}

/// A bearer token in decoded form.
///
/// The client never verifies the signature - it does not hold the signing
/// secret, and the server re-checks the token on every request. What the
/// client does enforce is the expiry claim: the credential is only usable
/// while `exp` lies strictly in the future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    raw: String,
    expires_at: DateTime<Utc>,
    subject: Option<String>,
}

impl Credential {
    /// Decode a raw token string without trusting it yet.
    /// Fails on undecodable payloads and on tokens without an expiry claim.
    pub fn decode(raw: &str) -> Result<Self, CredentialError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(raw, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;

        let exp = data
            .claims
            .exp
            .ok_or_else(|| CredentialError::Malformed("missing exp claim".to_string()))?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| CredentialError::Malformed(format!("exp {} out of range", exp)))?;

        Ok(Self {
            raw: raw.to_string(),
            expires_at,
            subject: data.claims.sub,
        })
    }

    /// Decode and additionally require the expiry to be in the future
    pub fn decode_valid(raw: &str) -> Result<Self, CredentialError> {
        let credential = Self::decode(raw)?;
        if credential.is_expired() {
            return Err(CredentialError::Expired(credential.expires_at));
        }
        Ok(credential)
    }

    /// Strictly time-based, evaluated against the clock on every call
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn token(&self) -> &str {
        &self.raw
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Minutes remaining until expiry (for the status bar)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }
}

/// The session aggregate the rest of the application reads.
///
/// Authentication is derived, not stored: the session is authenticated
/// exactly when an identity is present, and an identity can only be
/// installed alongside a credential.
#[derive(Debug, Default)]
pub struct Session {
    credential: Option<Credential>,
    identity: Option<User>,
    is_loading: bool,
    last_error: Option<String>,
}

impl Session {
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// True while a restored credential still awaits its identity fetch
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The bearer token, if a credential is installed
    pub fn token(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.token())
    }

    pub fn username(&self) -> Option<&str> {
        self.identity.as_ref().map(|u| u.username.as_str())
    }
}

/// What `restore` found on disk, telling the caller whether an identity
/// fetch must be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// Nothing usable persisted; the session is empty
    LoggedOut,
    /// A valid credential was installed; fetch the identity to settle
    PendingIdentity,
}

/// Single source of truth for the credential/identity pair.
///
/// Owns the persisted credential slot. All mutation goes through
/// `restore`/`set`/`clear` so the file and the in-memory state never
/// disagree: `set` writes the file before touching memory, `clear`
/// removes it as part of the reset.
#[derive(Debug)]
pub struct SessionStore {
    dir: PathBuf,
    session: Session,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read the persisted credential, if any, and validate it.
    ///
    /// Undecodable or expired tokens are purged silently - the user just
    /// appears logged out. A valid token is installed with the session in
    /// its loading state; the caller schedules the identity fetch and
    /// applies the result through the gateway.
    pub fn restore(&mut self) -> Restored {
        let path = self.credential_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No persisted credential");
                return Restored::LoggedOut;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read credential file");
                return Restored::LoggedOut;
            }
        };

        match Credential::decode_valid(&raw) {
            Ok(credential) => {
                debug!(expires_at = %credential.expires_at(), "Restored persisted credential");
                self.session.credential = Some(credential);
                self.session.is_loading = true;
                Restored::PendingIdentity
            }
            Err(e) => {
                debug!(reason = %e, "Purging persisted credential");
                self.purge_file();
                Restored::LoggedOut
            }
        }
    }

    /// Install a credential/identity pair, persisting the credential first.
    /// On a write failure nothing is mutated.
    pub fn set(&mut self, credential: Credential, identity: User) -> Result<()> {
        let path = self.credential_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create credential directory")?;
        }
        std::fs::write(&path, credential.token()).context("Failed to persist credential")?;

        self.session.credential = Some(credential);
        self.session.identity = Some(identity);
        self.session.is_loading = false;
        self.session.last_error = None;
        Ok(())
    }

    /// Reset to the empty session, removing the persisted credential.
    /// Backs logout, so it cannot fail; removal errors are logged only.
    pub fn clear(&mut self) {
        self.purge_file();
        self.session = Session::default();
    }

    /// Record a user-facing error and settle any pending loading state.
    /// The credential/identity pair is left alone.
    pub fn set_error(&mut self, message: String) {
        self.session.last_error = Some(message);
        self.session.is_loading = false;
    }

    fn purge_file(&mut self) {
        let path = self.credential_path();
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(error = %e, "Failed to remove credential file");
            }
        }
    }

    fn credential_path(&self) -> PathBuf {
        self.dir.join(CREDENTIAL_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("Failed to encode test token")
    }

    fn future_token() -> String {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        make_token(serde_json::json!({ "sub": "alice", "exp": exp }))
    }

    fn expired_token() -> String {
        let exp = (Utc::now() - Duration::hours(1)).timestamp();
        make_token(serde_json::json!({ "sub": "alice", "exp": exp }))
    }

    fn test_user() -> User {
        User {
            id: 3,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Credential Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_reads_expiry_and_subject() {
        let credential = Credential::decode(&future_token()).expect("should decode");
        assert_eq!(credential.subject(), Some("alice"));
        assert!(!credential.is_expired());
        assert!(credential.expires_at() > Utc::now());
        assert!(credential.minutes_until_expiry() > 0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Credential::decode("not-a-jwt"),
            Err(CredentialError::Malformed(_))
        ));
        assert!(matches!(
            Credential::decode(""),
            Err(CredentialError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_requires_exp_claim() {
        let token = make_token(serde_json::json!({ "sub": "alice" }));
        assert!(matches!(
            Credential::decode(&token),
            Err(CredentialError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_valid_rejects_expired() {
        assert!(matches!(
            Credential::decode_valid(&expired_token()),
            Err(CredentialError::Expired(_))
        ));
        // Plain decode still works; expiry is the caller's call to make
        let credential = Credential::decode(&expired_token()).expect("should decode");
        assert!(credential.is_expired());
        assert_eq!(credential.minutes_until_expiry(), 0);
    }

    // -------------------------------------------------------------------------
    // SessionStore Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_restore_with_no_file_is_logged_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());

        assert_eq!(store.restore(), Restored::LoggedOut);
        assert!(!store.session().is_authenticated());
        assert!(!store.session().is_loading());
        assert!(store.session().credential().is_none());
    }

    #[test]
    fn test_restore_purges_expired_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CREDENTIAL_FILE);
        std::fs::write(&path, expired_token()).expect("write token");

        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(store.restore(), Restored::LoggedOut);
        assert!(!path.exists(), "expired credential file must be removed");
        assert!(store.session().credential().is_none());
        assert!(store.session().last_error().is_none(), "purge is silent");
    }

    #[test]
    fn test_restore_purges_undecodable_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CREDENTIAL_FILE);
        std::fs::write(&path, "garbage-token").expect("write token");

        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(store.restore(), Restored::LoggedOut);
        assert!(!path.exists());
    }

    #[test]
    fn test_restore_installs_valid_token_as_loading() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CREDENTIAL_FILE);
        let token = future_token();
        std::fs::write(&path, &token).expect("write token");

        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(store.restore(), Restored::PendingIdentity);
        assert!(store.session().is_loading());
        assert!(!store.session().is_authenticated(), "no identity yet");
        assert_eq!(store.session().token(), Some(token.as_str()));
        assert!(path.exists(), "valid credential stays persisted");
    }

    #[test]
    fn test_set_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        store.set_error("previous failure".to_string());

        let credential = Credential::decode(&future_token()).expect("decode");
        let user = test_user();
        store.set(credential.clone(), user.clone()).expect("set");

        assert!(store.session().is_authenticated());
        assert_eq!(store.session().credential(), Some(&credential));
        assert_eq!(store.session().identity(), Some(&user));
        assert_eq!(store.session().username(), Some("alice"));
        assert!(store.session().last_error().is_none(), "set clears errors");

        let persisted =
            std::fs::read_to_string(dir.path().join(CREDENTIAL_FILE)).expect("read back");
        assert_eq!(persisted, credential.token());
    }

    #[test]
    fn test_restore_after_set_requires_identity_fetch() {
        // Identity is never persisted; a fresh process must re-fetch it
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        let credential = Credential::decode(&future_token()).expect("decode");
        store.set(credential, test_user()).expect("set");

        let mut fresh = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(fresh.restore(), Restored::PendingIdentity);
        assert!(fresh.session().is_loading());
        assert!(!fresh.session().is_authenticated());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        let credential = Credential::decode(&future_token()).expect("decode");
        store.set(credential, test_user()).expect("set");

        store.clear();
        assert!(!store.session().is_authenticated());
        assert!(!dir.path().join(CREDENTIAL_FILE).exists());

        // Clearing an already-empty store changes nothing and cannot fail
        store.clear();
        assert!(!store.session().is_authenticated());
        assert!(store.session().credential().is_none());
    }

    #[test]
    fn test_set_error_settles_loading() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CREDENTIAL_FILE);
        std::fs::write(&path, future_token()).expect("write token");

        let mut store = SessionStore::new(dir.path().to_path_buf());
        store.restore();
        assert!(store.session().is_loading());

        store.set_error("something failed".to_string());
        assert!(!store.session().is_loading());
        assert_eq!(store.session().last_error(), Some("something failed"));
    }
}
