//! API client for communicating with the DocSecure REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests for documents, share links, and audit logs, plus the
//! unauthenticated public share endpoints.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{multipart, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::models::{AuditFilter, AuditLog, Document, ShareLink, SharedDocumentInfo, User};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s leaves room for slow uploads while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Response from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the DocSecure REST API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    /// Background tasks get their own handle without re-establishing connections.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Check if a response is successful, mapping failures with body detail.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path = path, "GET");
        let response = self.request(Method::GET, path).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, path).await
    }

    // ===== Authentication =====

    /// Exchange username and password for a bearer token (form-encoded)
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        debug!(username = username, "POST /token");
        let response = self
            .request(Method::POST, "/token")
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let token: TokenResponse = Self::parse_json(response, "/token").await?;
        Ok(token.access_token)
    }

    /// Create a new account. The response body is unused; success is the
    /// cue for the auto-login that follows.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        debug!(username = username, "POST /register");
        let body = serde_json::json!({
            "email": email,
            "username": username,
            "password": password,
        });
        let response = self
            .request(Method::POST, "/register")
            .json(&body)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Fetch the profile of the authenticated user
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json("/users/me").await
    }

    // ===== Documents =====

    /// List the caller's documents
    pub async fn list_documents(&self, skip: u32, limit: u32) -> Result<Vec<Document>, ApiError> {
        self.get_json(&format!("/documents/?skip={}&limit={}", skip, limit))
            .await
    }

    /// Fetch a single document by id
    pub async fn get_document(&self, id: i64) -> Result<Document, ApiError> {
        self.get_json(&format!("/documents/{}", id)).await
    }

    /// Upload a file as a new document.
    /// The caller supplies the bytes; the MIME type is guessed from the name.
    pub async fn upload_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        description: Option<&str>,
    ) -> Result<Document, ApiError> {
        debug!(file_name = file_name, size = bytes.len(), "POST /documents/");

        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())?;

        let mut form = multipart::Form::new().part("file", part);
        if let Some(description) = description {
            form = form.text("description", description.to_string());
        }

        let response = self
            .request(Method::POST, "/documents/")
            .multipart(form)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, "/documents/").await
    }

    /// Delete a document (server answers 204)
    pub async fn delete_document(&self, id: i64) -> Result<(), ApiError> {
        debug!(id = id, "DELETE /documents");
        let response = self
            .request(Method::DELETE, &format!("/documents/{}", id))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Share links =====

    /// Create a share link for a document.
    /// A missing expiry lets the server apply its default (7 days).
    pub async fn create_share(
        &self,
        document_id: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ShareLink, ApiError> {
        debug!(document_id = document_id, "POST /shares/");
        let body = serde_json::json!({
            "document_id": document_id,
            "expires_at": expires_at,
        });
        let response = self
            .request(Method::POST, "/shares/")
            .json(&body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, "/shares/").await
    }

    /// List the caller's active share links
    pub async fn list_shares(&self) -> Result<Vec<ShareLink>, ApiError> {
        self.get_json("/shares/").await
    }

    /// Deactivate a share link (server answers 204 and keeps the row)
    pub async fn delete_share(&self, id: i64) -> Result<(), ApiError> {
        debug!(id = id, "DELETE /shares");
        let response = self
            .request(Method::DELETE, &format!("/shares/{}", id))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Public share access (no authentication) =====

    /// Fetch the public metadata for a shared document
    pub async fn shared_document_info(&self, token: &str) -> Result<SharedDocumentInfo, ApiError> {
        self.get_json(&format!("/public/documents/{}", token)).await
    }

    /// Download a shared document's bytes
    pub async fn download_shared_document(&self, token: &str) -> Result<Vec<u8>, ApiError> {
        let path = format!("/public/documents/{}/download", token);
        debug!(path = %path, "GET");
        let response = self.request(Method::GET, &path).send().await?;
        let response = Self::check_response(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    // ===== Audit =====

    /// Fetch audit entries matching the filter, newest first
    pub async fn audit_logs(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, ApiError> {
        let mut path = format!("/audit-logs/?skip={}&limit={}", filter.skip, filter.limit);
        if let Some(action) = filter.action.as_query() {
            path.push_str(&format!("&action={}", action));
        }
        if let Some(resource_type) = filter.resource.as_query() {
            path.push_str(&format!("&resource_type={}", resource_type));
        }
        self.get_json(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionFilter, ResourceFilter};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_token_response() {
        let json = r#"{"access_token": "abc.def.ghi", "token_type": "bearer"}"#;
        let parsed: TokenResponse = serde_json::from_str(json).expect("Failed to parse token JSON");
        assert_eq!(parsed.access_token, "abc.def.ghi");
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ApiClient::new("http://localhost:8000/").expect("client");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_login_posts_form_and_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("password=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok123", "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).expect("client");
        let token = client
            .login("alice", "secret")
            .await
            .expect("login should succeed");
        assert_eq!(token, "tok123");
    }

    #[tokio::test]
    async fn test_login_rejection_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Incorrect username or password"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).expect("client");
        let err = client
            .login("alice", "wrong")
            .await
            .expect_err("login should fail");
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_current_user_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .and(header("authorization", "Bearer tok123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 3, "username": "alice", "email": "alice@example.com"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .expect("client")
            .with_token("tok123".to_string());
        let user = client.current_user().await.expect("should fetch user");
        assert_eq!(user.username, "alice");
        assert_eq!(user.id, 3);
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/"))
            .and(body_string_contains("filename=\"notes.txt\""))
            .and(body_string_contains("hello world"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1,
                "filename": "abc123.txt",
                "original_filename": "notes.txt",
                "content_type": "text/plain",
                "file_size": 11,
                "file_path": "uploads/abc123.txt",
                "description": "notes",
                "user_id": 3,
                "created_at": "2024-05-02T10:15:30Z",
                "updated_at": null
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .expect("client")
            .with_token("tok".to_string());
        let doc = client
            .upload_document("notes.txt", b"hello world".to_vec(), Some("notes"))
            .await
            .expect("upload should succeed");
        assert_eq!(doc.original_filename, "notes.txt");
    }

    #[tokio::test]
    async fn test_get_document_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documents/42"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "filename": "def456.pdf",
                "original_filename": "report.pdf",
                "content_type": "application/pdf",
                "file_size": 2048,
                "file_path": "uploads/def456.pdf",
                "description": null,
                "user_id": 3,
                "created_at": "2024-05-02T10:15:30Z",
                "updated_at": null
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .expect("client")
            .with_token("tok".to_string());
        let doc = client.get_document(42).await.expect("should fetch");
        assert_eq!(doc.id, 42);
        assert_eq!(doc.original_filename, "report.pdf");
    }

    #[tokio::test]
    async fn test_audit_query_includes_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audit-logs/"))
            .and(query_param("action", "delete"))
            .and(query_param("resource_type", "document"))
            .and(query_param("skip", "0"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .expect("client")
            .with_token("tok".to_string());
        let filter = AuditFilter {
            action: ActionFilter::Delete,
            resource: ResourceFilter::Document,
            ..AuditFilter::default()
        };
        let logs = client.audit_logs(&filter).await.expect("should list logs");
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_download_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/documents/tok123/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 fake".to_vec()))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).expect("client");
        let bytes = client
            .download_shared_document("tok123")
            .await
            .expect("download should succeed");
        assert_eq!(bytes, b"%PDF-1.7 fake");
    }

    #[tokio::test]
    async fn test_shared_info_not_found_carries_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/documents/badtoken"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "Share link not found or expired"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).expect("client");
        let err = client
            .shared_document_info("badtoken")
            .await
            .expect_err("lookup should fail");
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "Share link not found or expired"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
