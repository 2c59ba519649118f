use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored document, as returned by the document endpoints.
///
/// `filename` is the server-generated name on disk; `original_filename` is
/// what the uploader called it and is the one meant for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub file_path: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn display_name(&self) -> &str {
        &self.original_filename
    }

    /// Short label for the content type ("pdf", "png", ...) used in tables
    pub fn kind(&self) -> &str {
        match self.content_type.as_str() {
            "application/pdf" => "pdf",
            "application/msword" => "doc",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
            "application/vnd.ms-excel" => "xls",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
            "application/vnd.ms-powerpoint" => "ppt",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
            "text/plain" => "txt",
            "text/csv" => "csv",
            "image/jpeg" => "jpeg",
            "image/png" => "png",
            "image/gif" => "gif",
            other => other.rsplit('/').next().unwrap_or(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_response() {
        let json = r#"{
            "id": 12,
            "filename": "a1b2c3d4.pdf",
            "original_filename": "report.pdf",
            "content_type": "application/pdf",
            "file_size": 52433,
            "file_path": "uploads/a1b2c3d4.pdf",
            "description": "Quarterly report",
            "user_id": 3,
            "created_at": "2024-05-02T10:15:30Z",
            "updated_at": null
        }"#;

        let doc: Document = serde_json::from_str(json).expect("Failed to parse document JSON");
        assert_eq!(doc.id, 12);
        assert_eq!(doc.display_name(), "report.pdf");
        assert_eq!(doc.kind(), "pdf");
        assert_eq!(doc.file_size, 52433);
        assert!(doc.updated_at.is_none());
    }

    #[test]
    fn test_kind_falls_back_to_subtype() {
        let json = r#"{
            "id": 1,
            "filename": "x",
            "original_filename": "x.bin",
            "content_type": "application/octet-stream",
            "file_size": 1,
            "file_path": "uploads/x",
            "description": null,
            "user_id": 1,
            "created_at": "2024-05-02T10:15:30Z",
            "updated_at": null
        }"#;
        let doc: Document = serde_json::from_str(json).expect("Failed to parse document JSON");
        assert_eq!(doc.kind(), "octet-stream");
    }
}
