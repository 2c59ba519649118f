//! Login, registration, and identity fetch, plus the apply phase that
//! writes their outcomes into a `SessionStore`.
//!
//! Each operation is split in two. The network phase (`login`, `register`,
//! `fetch_identity`) is a plain async function run inside a spawned task
//! with a cloned `ApiClient`; it never touches the store. The apply phase
//! (`apply_login`, `apply_rehydrate`) is synchronous and runs on the event
//! loop with `&mut SessionStore`. A generation counter ties the phases
//! together: every attempt is stamped by `begin_attempt`, and results
//! carrying a superseded stamp are dropped, so overlapping attempts always
//! resolve to the most recent one.

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::User;

use super::session::{Credential, CredentialError, SessionStore};

/// Failures of the identity operations, each rendering as a message fit
/// for inline display next to the originating form.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    DuplicateOrInvalidRegistration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Session expired - please log in again")]
    TokenExpired,

    #[error("Received a malformed token: {0}")]
    TokenMalformed(String),
}

impl AuthError {
    /// How a token-endpoint failure reads to the user
    fn from_login(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized => AuthError::InvalidCredentials,
            other => AuthError::NetworkFailure(other.to_string()),
        }
    }

    /// Registration rejections carry the server's reason (duplicate email,
    /// duplicate username, invalid fields) verbatim
    fn from_register(e: ApiError) -> Self {
        match e {
            ApiError::BadRequest(msg) => AuthError::DuplicateOrInvalidRegistration(msg),
            other => AuthError::NetworkFailure(other.to_string()),
        }
    }

    fn from_identity(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized => AuthError::TokenExpired,
            other => AuthError::NetworkFailure(other.to_string()),
        }
    }
}

impl From<CredentialError> for AuthError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Malformed(msg) => AuthError::TokenMalformed(msg),
            CredentialError::Expired(_) => AuthError::TokenExpired,
        }
    }
}

/// Everything a successful login produces, applied to the store as one unit
#[derive(Debug)]
pub struct LoginSuccess {
    pub credential: Credential,
    pub identity: User,
}

/// Outcome of applying a completed attempt to the store
#[derive(Debug, PartialEq, Eq)]
pub enum Applied {
    /// The store now holds an authenticated session
    LoggedIn,
    /// The failure was recorded in `last_error` for inline display
    Failed(String),
    /// The session was cleared silently (rehydration failure)
    LoggedOut,
    /// A newer attempt superseded this result; nothing changed
    Stale,
}

/// Runs the identity operations and is the only writer to a `SessionStore`.
#[derive(Debug, Default)]
pub struct AuthGateway {
    generation: u64,
}

impl AuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new attempt. Any earlier outstanding attempt becomes stale.
    pub fn begin_attempt(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    // ===== Network phase =====

    /// Token acquisition followed by the identity fetch.
    ///
    /// Fails as a whole: if the identity fetch fails, the freshly issued
    /// credential is dropped, never stored.
    pub async fn login(
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<LoginSuccess, AuthError> {
        let raw = api
            .login(username, password)
            .await
            .map_err(AuthError::from_login)?;
        let credential = Credential::decode_valid(&raw)?;

        let authed = api.with_token(credential.token().to_string());
        let identity = authed
            .current_user()
            .await
            .map_err(AuthError::from_identity)?;

        debug!(username = %identity.username, "Login succeeded");
        Ok(LoginSuccess {
            credential,
            identity,
        })
    }

    /// Registration followed by an automatic login with the same credentials
    pub async fn register(
        api: &ApiClient,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<LoginSuccess, AuthError> {
        api.register(email, username, password)
            .await
            .map_err(AuthError::from_register)?;
        Self::login(api, username, password).await
    }

    /// Identity fetch for an already-installed credential (rehydration)
    pub async fn fetch_identity(api: &ApiClient) -> Result<User, AuthError> {
        api.current_user().await.map_err(AuthError::from_identity)
    }

    // ===== Apply phase =====

    /// Apply a login (or registration) outcome to the store.
    ///
    /// `Applied::LoggedIn` means navigate to the main screen;
    /// `Applied::Failed` means the message is in `last_error`, keep the form.
    pub fn apply_login(
        &self,
        store: &mut SessionStore,
        generation: u64,
        outcome: Result<LoginSuccess, AuthError>,
    ) -> Applied {
        if !self.is_current(generation) {
            debug!(
                generation,
                current = self.generation,
                "Dropping stale login result"
            );
            return Applied::Stale;
        }

        match outcome {
            Ok(login) => match store.set(login.credential, login.identity) {
                Ok(()) => Applied::LoggedIn,
                Err(e) => {
                    let message = format!("Could not save session: {}", e);
                    store.set_error(message.clone());
                    Applied::Failed(message)
                }
            },
            Err(e) => {
                let message = e.to_string();
                store.set_error(message.clone());
                Applied::Failed(message)
            }
        }
    }

    /// Apply a rehydration outcome.
    ///
    /// Failures clear the store without recording an error - the user
    /// simply appears logged out, exactly as if no credential had been
    /// persisted at all.
    pub fn apply_rehydrate(
        &self,
        store: &mut SessionStore,
        generation: u64,
        outcome: Result<User, AuthError>,
    ) -> Applied {
        if !self.is_current(generation) {
            debug!(
                generation,
                current = self.generation,
                "Dropping stale identity result"
            );
            return Applied::Stale;
        }

        let Some(credential) = store.session().credential().cloned() else {
            // Session was cleared while the fetch was in flight
            return Applied::Stale;
        };

        match outcome {
            Ok(identity) => match store.set(credential, identity) {
                Ok(()) => Applied::LoggedIn,
                Err(e) => {
                    warn!(error = %e, "Failed to re-persist restored credential");
                    store.clear();
                    Applied::LoggedOut
                }
            },
            Err(e) => {
                debug!(reason = %e, "Identity fetch failed; clearing session");
                store.clear();
                Applied::LoggedOut
            }
        }
    }

    /// Unconditional reset. Idempotent and infallible; also invalidates
    /// any attempt still in flight.
    pub fn logout(&mut self, store: &mut SessionStore) {
        self.generation += 1;
        store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::Restored;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mint_token(offset: Duration) -> String {
        let claims = serde_json::json!({
            "sub": "alice",
            "exp": (Utc::now() + offset).timestamp(),
        });
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("Failed to encode test token")
    }

    fn user_body() -> serde_json::Value {
        serde_json::json!({
            "id": 3,
            "username": "alice",
            "email": "alice@example.com",
        })
    }

    fn test_store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    async fn mock_login_endpoints(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": token,
                "token_type": "bearer",
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_success_applies_to_store() {
        let server = MockServer::start().await;
        let token = mint_token(Duration::hours(1));
        mock_login_endpoints(&server, &token).await;

        let api = ApiClient::new(server.uri()).expect("client");
        let (_dir, mut store) = test_store();
        let mut gateway = AuthGateway::new();

        let generation = gateway.begin_attempt();
        let outcome = AuthGateway::login(&api, "alice", "secret").await;
        assert!(outcome.is_ok());

        let applied = gateway.apply_login(&mut store, generation, outcome);
        assert_eq!(applied, Applied::LoggedIn);
        assert!(store.session().is_authenticated());
        assert_eq!(store.session().username(), Some("alice"));
        assert_eq!(store.session().token(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_login_bad_password_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Incorrect username or password",
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri()).expect("client");
        let (dir, mut store) = test_store();
        let mut gateway = AuthGateway::new();

        let generation = gateway.begin_attempt();
        let outcome = AuthGateway::login(&api, "alice", "wrong").await;
        assert!(matches!(outcome, Err(AuthError::InvalidCredentials)));

        let applied = gateway.apply_login(&mut store, generation, outcome);
        assert!(matches!(applied, Applied::Failed(_)));
        assert!(!store.session().is_authenticated());
        assert_eq!(
            store.session().last_error(),
            Some("Invalid username or password")
        );
        assert!(
            !dir.path().join("credential.jwt").exists(),
            "nothing may be persisted on failure"
        );
    }

    #[tokio::test]
    async fn test_login_identity_failure_discards_credential() {
        let server = MockServer::start().await;
        let token = mint_token(Duration::hours(1));
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": token,
                "token_type": "bearer",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri()).expect("client");
        let (dir, mut store) = test_store();
        let mut gateway = AuthGateway::new();

        let generation = gateway.begin_attempt();
        let outcome = AuthGateway::login(&api, "alice", "secret").await;
        assert!(matches!(outcome, Err(AuthError::NetworkFailure(_))));

        let applied = gateway.apply_login(&mut store, generation, outcome);
        assert!(matches!(applied, Applied::Failed(_)));
        assert!(store.session().credential().is_none(), "token is dropped");
        assert!(!dir.path().join("credential.jwt").exists());
    }

    #[tokio::test]
    async fn test_login_rejects_expired_token_from_server() {
        let server = MockServer::start().await;
        let token = mint_token(Duration::hours(-1));
        mock_login_endpoints(&server, &token).await;

        let api = ApiClient::new(server.uri()).expect("client");
        let outcome = AuthGateway::login(&api, "alice", "secret").await;
        assert!(matches!(outcome, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_register_duplicate_carries_server_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "detail": "Email already registered",
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri()).expect("client");
        let outcome = AuthGateway::register(&api, "a@b.com", "alice", "secret").await;
        match outcome {
            Err(AuthError::DuplicateOrInvalidRegistration(msg)) => {
                assert_eq!(msg, "Email already registered");
            }
            other => panic!("expected registration error, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn test_register_auto_logs_in() {
        let server = MockServer::start().await;
        let token = mint_token(Duration::hours(1));
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
            .mount(&server)
            .await;
        mock_login_endpoints(&server, &token).await;

        let api = ApiClient::new(server.uri()).expect("client");
        let (_dir, mut store) = test_store();
        let mut gateway = AuthGateway::new();

        let generation = gateway.begin_attempt();
        let outcome = AuthGateway::register(&api, "a@b.com", "alice", "secret").await;
        let applied = gateway.apply_login(&mut store, generation, outcome);
        assert_eq!(applied, Applied::LoggedIn);
        assert!(store.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_stale_generation_is_dropped() {
        let server = MockServer::start().await;
        let token = mint_token(Duration::hours(1));
        mock_login_endpoints(&server, &token).await;

        let api = ApiClient::new(server.uri()).expect("client");
        let (_dir, mut store) = test_store();
        let mut gateway = AuthGateway::new();

        let first = gateway.begin_attempt();
        let outcome = AuthGateway::login(&api, "alice", "secret").await;

        // A second attempt supersedes the first before it lands
        let second = gateway.begin_attempt();

        let applied = gateway.apply_login(&mut store, first, outcome);
        assert_eq!(applied, Applied::Stale);
        assert!(!store.session().is_authenticated(), "store untouched");

        let outcome = AuthGateway::login(&api, "alice", "secret").await;
        let applied = gateway.apply_login(&mut store, second, outcome);
        assert_eq!(applied, Applied::LoggedIn);
    }

    #[tokio::test]
    async fn test_rehydrate_unauthorized_clears_silently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("credential.jwt");
        std::fs::write(&path, mint_token(Duration::hours(1))).expect("write token");

        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(store.restore(), Restored::PendingIdentity);

        let mut gateway = AuthGateway::new();
        let generation = gateway.begin_attempt();
        let applied = gateway.apply_rehydrate(&mut store, generation, Err(AuthError::TokenExpired));

        assert_eq!(applied, Applied::LoggedOut);
        assert!(!store.session().is_authenticated());
        assert!(!store.session().is_loading());
        assert!(store.session().last_error().is_none(), "no error surfaced");
        assert!(!path.exists(), "credential file purged");
    }

    #[tokio::test]
    async fn test_rehydrate_success_settles_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("credential.jwt"), mint_token(Duration::hours(1)))
            .expect("write token");

        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(store.restore(), Restored::PendingIdentity);
        let token = store.session().token().map(str::to_string);

        let mut gateway = AuthGateway::new();
        let generation = gateway.begin_attempt();
        let api = ApiClient::new(server.uri())
            .expect("client")
            .with_token(token.clone().unwrap_or_default());
        let outcome = AuthGateway::fetch_identity(&api).await;

        let applied = gateway.apply_rehydrate(&mut store, generation, outcome);
        assert_eq!(applied, Applied::LoggedIn);
        assert!(store.session().is_authenticated());
        assert!(!store.session().is_loading());
        assert_eq!(store.session().token(), token.as_deref());
    }

    #[tokio::test]
    async fn test_logout_invalidates_inflight_attempt() {
        let server = MockServer::start().await;
        let token = mint_token(Duration::hours(1));
        mock_login_endpoints(&server, &token).await;

        let api = ApiClient::new(server.uri()).expect("client");
        let (_dir, mut store) = test_store();
        let mut gateway = AuthGateway::new();

        let generation = gateway.begin_attempt();
        let outcome = AuthGateway::login(&api, "alice", "secret").await;

        gateway.logout(&mut store);
        let applied = gateway.apply_login(&mut store, generation, outcome);
        assert_eq!(applied, Applied::Stale);
        assert!(!store.session().is_authenticated());

        // Logging out again is a no-op
        gateway.logout(&mut store);
        assert!(!store.session().is_authenticated());
    }
}
