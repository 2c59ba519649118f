use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audit trail entry, newest-first from the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLog {
    /// "document #12", "share", ... for table cells
    pub fn resource_display(&self) -> String {
        match self.resource_id {
            Some(ref id) => format!("{} #{}", self.resource_type, id),
            None => self.resource_type.clone(),
        }
    }

    pub fn actor_display(&self) -> &str {
        self.username.as_deref().unwrap_or("-")
    }
}

/// Action filter for the audit view, cycled in the order the server
/// vocabulary defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionFilter {
    #[default]
    All,
    Create,
    Read,
    List,
    Delete,
    Access,
    Download,
    Login,
    Register,
}

impl ActionFilter {
    pub fn next(self) -> Self {
        match self {
            ActionFilter::All => ActionFilter::Create,
            ActionFilter::Create => ActionFilter::Read,
            ActionFilter::Read => ActionFilter::List,
            ActionFilter::List => ActionFilter::Delete,
            ActionFilter::Delete => ActionFilter::Access,
            ActionFilter::Access => ActionFilter::Download,
            ActionFilter::Download => ActionFilter::Login,
            ActionFilter::Login => ActionFilter::Register,
            ActionFilter::Register => ActionFilter::All,
        }
    }

    /// Query value for the request, None meaning "no filter"
    pub fn as_query(self) -> Option<&'static str> {
        match self {
            ActionFilter::All => None,
            ActionFilter::Create => Some("create"),
            ActionFilter::Read => Some("read"),
            ActionFilter::List => Some("list"),
            ActionFilter::Delete => Some("delete"),
            ActionFilter::Access => Some("access"),
            ActionFilter::Download => Some("download"),
            ActionFilter::Login => Some("login"),
            ActionFilter::Register => Some("register"),
        }
    }

    pub fn label(self) -> &'static str {
        self.as_query().unwrap_or("all")
    }
}

/// Resource-type filter for the audit view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceFilter {
    #[default]
    All,
    Document,
    User,
    Share,
}

impl ResourceFilter {
    pub fn next(self) -> Self {
        match self {
            ResourceFilter::All => ResourceFilter::Document,
            ResourceFilter::Document => ResourceFilter::User,
            ResourceFilter::User => ResourceFilter::Share,
            ResourceFilter::Share => ResourceFilter::All,
        }
    }

    pub fn as_query(self) -> Option<&'static str> {
        match self {
            ResourceFilter::All => None,
            ResourceFilter::Document => Some("document"),
            ResourceFilter::User => Some("user"),
            ResourceFilter::Share => Some("share"),
        }
    }

    pub fn label(self) -> &'static str {
        self.as_query().unwrap_or("all")
    }
}

/// Query parameters accepted by the audit endpoint.
#[derive(Debug, Clone, Copy)]
pub struct AuditFilter {
    pub action: ActionFilter,
    pub resource: ResourceFilter,
    pub skip: u32,
    pub limit: u32,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            action: ActionFilter::All,
            resource: ResourceFilter::All,
            skip: 0,
            limit: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audit_log_response() {
        let json = r#"{
            "id": 44,
            "user_id": 3,
            "username": "alice",
            "action": "delete",
            "resource_type": "document",
            "resource_id": "12",
            "details": "Deleted document: report.pdf",
            "ip_address": "127.0.0.1",
            "timestamp": "2024-05-02T10:15:30Z"
        }"#;

        let log: AuditLog = serde_json::from_str(json).expect("Failed to parse audit log JSON");
        assert_eq!(log.action, "delete");
        assert_eq!(log.resource_display(), "document #12");
        assert_eq!(log.actor_display(), "alice");
    }

    #[test]
    fn test_parse_audit_log_anonymous() {
        // register/login events can predate any user association
        let json = r#"{
            "id": 1,
            "user_id": null,
            "username": null,
            "action": "register",
            "resource_type": "user",
            "resource_id": null,
            "details": null,
            "ip_address": null,
            "timestamp": "2024-05-02T10:15:30Z"
        }"#;

        let log: AuditLog = serde_json::from_str(json).expect("Failed to parse audit log JSON");
        assert_eq!(log.resource_display(), "user");
        assert_eq!(log.actor_display(), "-");
    }

    #[test]
    fn test_action_filter_cycles_through_all() {
        let mut filter = ActionFilter::All;
        let mut seen = 0;
        loop {
            filter = filter.next();
            seen += 1;
            if filter == ActionFilter::All {
                break;
            }
        }
        assert_eq!(seen, 9); // eight actions plus the wrap back to All
        assert_eq!(ActionFilter::Login.next(), ActionFilter::Register);
        assert_eq!(ActionFilter::Register.next(), ActionFilter::All);
    }

    #[test]
    fn test_filter_query_values() {
        assert_eq!(ActionFilter::All.as_query(), None);
        assert_eq!(ActionFilter::Download.as_query(), Some("download"));
        assert_eq!(ResourceFilter::All.as_query(), None);
        assert_eq!(ResourceFilter::Share.as_query(), Some("share"));
        assert_eq!(ActionFilter::All.label(), "all");
        assert_eq!(ResourceFilter::Document.label(), "document");
    }
}
