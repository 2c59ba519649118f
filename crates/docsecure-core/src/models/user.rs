use serde::{Deserialize, Serialize};

/// The authenticated principal, as returned by the identity endpoint.
///
/// This is fetched from the server with the bearer token as proof; it is
/// never reconstructed from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_response() {
        let json = r#"{"id": 3, "username": "alice", "email": "alice@example.com"}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.id, 3);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
    }
}
