//! The gate in front of protected screens.

use super::session::Session;

/// What a protected screen should do on the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// A restored credential is still settling - show only the loading view
    Checking,
    /// Render the protected content
    Allow,
    /// Switch to the login screen, rendering none of the content
    RedirectToLogin,
}

/// Decide whether protected content may render.
///
/// Pure observation of the session - no network, no mutation - so it is
/// evaluated on every frame. The loading state wins over everything else:
/// protected content must not flash while an identity fetch is pending.
pub fn evaluate(session: &Session) -> GuardDecision {
    if session.is_loading() {
        GuardDecision::Checking
    } else if session.is_authenticated() {
        GuardDecision::Allow
    } else {
        GuardDecision::RedirectToLogin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{Credential, Restored, SessionStore};
    use crate::models::User;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    fn valid_token() -> String {
        let claims = serde_json::json!({
            "sub": "alice",
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("Failed to encode test token")
    }

    #[test]
    fn test_empty_session_redirects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(evaluate(store.session()), GuardDecision::RedirectToLogin);
    }

    #[test]
    fn test_pending_identity_checks() {
        // A restored credential without its identity must not expose
        // protected content, and must not redirect either
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("credential.jwt"), valid_token()).expect("write");

        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert_eq!(store.restore(), Restored::PendingIdentity);
        assert_eq!(evaluate(store.session()), GuardDecision::Checking);
    }

    #[test]
    fn test_authenticated_session_allows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        let credential = Credential::decode(&valid_token()).expect("decode");
        store
            .set(
                credential,
                User {
                    id: 1,
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                },
            )
            .expect("set");

        assert_eq!(evaluate(store.session()), GuardDecision::Allow);

        // Logging out flips the decision straight back to redirect
        store.clear();
        assert_eq!(evaluate(store.session()), GuardDecision::RedirectToLogin);
    }
}
