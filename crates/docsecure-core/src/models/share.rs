use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A share link minted for one document.
///
/// Deleting a share on the server deactivates it (`is_active = false`)
/// rather than removing the row; the list endpoint only returns active
/// links, so an inactive link in local state just means it was revoked
/// since the last refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    pub id: i64,
    pub token: String,
    pub document_id: i64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl ShareLink {
    /// Expiry is strictly time-based; a link with no expiry never expires.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= Utc::now(),
            None => false,
        }
    }

    /// True when the link can still be used by a recipient
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.is_expired()
    }

    /// The URL a recipient opens, rooted at the web origin (not the API host)
    pub fn public_url(&self, share_base_url: &str) -> String {
        format!("{}/shared/{}", share_base_url.trim_end_matches('/'), self.token)
    }
}

/// Public metadata for a shared document, served without authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDocumentInfo {
    pub id: i64,
    pub original_filename: String,
    pub content_type: String,
    pub description: Option<String>,
    pub shared_by: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn share(expires_at: Option<DateTime<Utc>>, is_active: bool) -> ShareLink {
        ShareLink {
            id: 1,
            token: "u7hc2qLEIprsSEXAMPLEtokenEXAMPL0".to_string(),
            document_id: 12,
            created_by: 3,
            created_at: Utc::now(),
            expires_at,
            is_active,
        }
    }

    #[test]
    fn test_share_expiry() {
        assert!(share(Some(Utc::now() - Duration::hours(1)), true).is_expired());
        assert!(!share(Some(Utc::now() + Duration::days(7)), true).is_expired());
        assert!(!share(None, true).is_expired());
    }

    #[test]
    fn test_share_usability() {
        assert!(share(Some(Utc::now() + Duration::days(1)), true).is_usable());
        assert!(!share(Some(Utc::now() + Duration::days(1)), false).is_usable());
        assert!(!share(Some(Utc::now() - Duration::hours(1)), true).is_usable());
    }

    #[test]
    fn test_public_url() {
        let s = share(None, true);
        assert_eq!(
            s.public_url("http://localhost:3000"),
            "http://localhost:3000/shared/u7hc2qLEIprsSEXAMPLEtokenEXAMPL0"
        );
        // Trailing slash on the base must not double up
        assert_eq!(
            s.public_url("http://localhost:3000/"),
            "http://localhost:3000/shared/u7hc2qLEIprsSEXAMPLEtokenEXAMPL0"
        );
    }
}
