//! Application state and background task orchestration.
//!
//! `App` owns everything the UI renders: the session store, the data for
//! each tab, form state for the auth screens and overlays, and the channel
//! that background tasks report back on. All network work runs in spawned
//! tasks; results come back as `TaskResult` messages and are applied on the
//! main loop between frames.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use docsecure_core::api::{ApiClient, ApiError};
use docsecure_core::auth::{
    Applied, AuthError, AuthGateway, CredentialStore, LoginSuccess, Restored, SessionStore,
};
use docsecure_core::models::{
    AuditFilter, AuditLog, Document, ShareLink, SharedDocumentInfo, User,
};
use docsecure_core::Config;

use crate::utils::{cmp_ignore_case, contains_ignore_case};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task channel.
/// A full refresh produces a handful of messages; 32 leaves ample headroom.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for username input
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for email input (254 is the practical RFC ceiling)
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and long passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for the upload path input
pub const MAX_PATH_LENGTH: usize = 256;

/// Maximum length for the upload description input
pub const MAX_DESCRIPTION_LENGTH: usize = 200;

/// Maximum length for the search query input
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Number of rows to jump on PageUp/PageDown
pub const PAGE_SCROLL_SIZE: usize = 10;

/// How many documents to request per refresh.
/// The server paginates; one page of 100 covers typical accounts.
const DOCUMENT_PAGE_SIZE: u32 = 100;

/// Expiry choices offered when creating a share link, in days
pub const SHARE_EXPIRY_DAYS: [i64; 4] = [1, 7, 30, 90];

/// Index of the default expiry choice (7 days, the server default)
pub const DEFAULT_SHARE_EXPIRY_CHOICE: usize = 1;

// ============================================================================
// UI state types
// ============================================================================

/// Top-level tabs of the main screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Documents,
    Shares,
    Audit,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Documents => "Documents",
            Tab::Shares => "Shares",
            Tab::Audit => "Audit Log",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tab::Documents => Tab::Shares,
            Tab::Shares => Tab::Audit,
            Tab::Audit => Tab::Documents,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Tab::Documents => Tab::Audit,
            Tab::Shares => Tab::Documents,
            Tab::Audit => Tab::Shares,
        }
    }
}

/// Modal state of the main screen. `Normal` is browsing; everything else
/// is an overlay that captures input until dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    UploadingDocument,
    CreatingShare,
    ViewingShareInfo,
    ConfirmingDelete,
    ConfirmingDeactivate,
    ConfirmingQuit,
    Quitting,
}

/// Which auth screen is visible when no session is established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScreen {
    Login,
    Register,
}

/// Focus within the login form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
    RegisterLink,
}

impl LoginFocus {
    pub fn next(self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::RegisterLink,
            LoginFocus::RegisterLink => LoginFocus::Username,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::RegisterLink,
            LoginFocus::Password => LoginFocus::Username,
            LoginFocus::Button => LoginFocus::Password,
            LoginFocus::RegisterLink => LoginFocus::Button,
        }
    }
}

/// Focus within the registration form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterFocus {
    Email,
    Username,
    Password,
    Confirm,
    Button,
    LoginLink,
}

impl RegisterFocus {
    pub fn next(self) -> Self {
        match self {
            RegisterFocus::Email => RegisterFocus::Username,
            RegisterFocus::Username => RegisterFocus::Password,
            RegisterFocus::Password => RegisterFocus::Confirm,
            RegisterFocus::Confirm => RegisterFocus::Button,
            RegisterFocus::Button => RegisterFocus::LoginLink,
            RegisterFocus::LoginLink => RegisterFocus::Email,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            RegisterFocus::Email => RegisterFocus::LoginLink,
            RegisterFocus::Username => RegisterFocus::Email,
            RegisterFocus::Password => RegisterFocus::Username,
            RegisterFocus::Confirm => RegisterFocus::Password,
            RegisterFocus::Button => RegisterFocus::Confirm,
            RegisterFocus::LoginLink => RegisterFocus::Button,
        }
    }
}

/// Focus within the upload overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFocus {
    Path,
    Description,
    Button,
}

impl UploadFocus {
    pub fn next(self) -> Self {
        match self {
            UploadFocus::Path => UploadFocus::Description,
            UploadFocus::Description => UploadFocus::Button,
            UploadFocus::Button => UploadFocus::Path,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            UploadFocus::Path => UploadFocus::Button,
            UploadFocus::Description => UploadFocus::Path,
            UploadFocus::Button => UploadFocus::Description,
        }
    }
}

/// Sortable columns of the documents table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSortColumn {
    Name,
    Size,
    Uploaded,
}

// ============================================================================
// Background task results
// ============================================================================

/// Messages sent back from spawned tasks to the main loop
pub enum TaskResult {
    /// A login or registration attempt finished
    Auth {
        generation: u64,
        outcome: Result<LoginSuccess, AuthError>,
    },
    /// An identity fetch for a restored credential finished
    Identity {
        generation: u64,
        outcome: Result<User, AuthError>,
    },
    Documents(Vec<Document>),
    Shares(Vec<ShareLink>),
    AuditLogs(Vec<AuditLog>),
    Uploaded(Document),
    Deleted(i64),
    ShareCreated(ShareLink),
    ShareDeactivated(i64),
    /// Public metadata for the share-info overlay arrived
    ShareInfo {
        url: String,
        token: String,
        info: SharedDocumentInfo,
    },
    /// A shared document was written to disk
    Downloaded(PathBuf),
    /// A protected request answered 401; the session is over
    SessionExpired,
    /// All refresh fetches have reported in
    RefreshComplete,
    Error(String),
}

/// Credentials of an attempt in flight, kept so a success can persist them
struct PendingLogin {
    username: String,
    password: String,
    from_keyring: bool,
}

/// Everything the share-info overlay shows, captured when it opens
pub struct ShareInfoView {
    pub url: String,
    pub token: String,
    pub info: SharedDocumentInfo,
}

// ============================================================================
// Application state
// ============================================================================

pub struct App {
    // Infrastructure
    pub config: Config,
    pub store: SessionStore,
    pub gateway: AuthGateway,
    pub api: ApiClient,

    // UI state
    pub state: AppState,
    pub current_tab: Tab,
    pub status_message: Option<String>,

    // Auth screens
    pub auth_screen: AuthScreen,
    pub auth_in_flight: bool,
    pub login_focus: LoginFocus,
    pub login_username: String,
    pub login_password: String,
    pub password_from_keyring: bool,
    pub register_focus: RegisterFocus,
    pub register_email: String,
    pub register_username: String,
    pub register_password: String,
    pub register_confirm: String,
    pending_login: Option<PendingLogin>,

    // Documents tab
    pub documents: Vec<Document>,
    pub document_selection: usize,
    pub document_sort_column: DocumentSortColumn,
    pub document_sort_ascending: bool,
    pub search_query: String,

    // Shares tab
    pub shares: Vec<ShareLink>,
    pub share_selection: usize,

    // Audit tab
    pub audit_logs: Vec<AuditLog>,
    pub audit_selection: usize,
    pub audit_filter: AuditFilter,

    // Overlay state
    pub upload_path: String,
    pub upload_description: String,
    pub upload_focus: UploadFocus,
    pub upload_error: Option<String>,
    pub share_expiry_choice: usize,
    pub pending_share: Option<(i64, String)>,
    pub pending_delete: Option<(i64, String)>,
    pub pending_deactivate: Option<i64>,
    pub share_info: Option<ShareInfoView>,

    // Background task channel
    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        let api = ApiClient::new(&config.api_base_url)?;
        let store = SessionStore::new(config.cache_dir()?);
        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill the login form: env vars win, then the last username from
        // the config with its remembered password from the system keychain.
        let mut login_username = std::env::var("DOCSECURE_USERNAME").unwrap_or_default();
        let mut login_password = std::env::var("DOCSECURE_PASSWORD").unwrap_or_default();
        if login_username.is_empty() {
            if let Some(ref last) = config.last_username {
                login_username = last.clone();
            }
        }
        let mut password_from_keyring = false;
        if !login_username.is_empty() && login_password.is_empty() {
            if let Some(saved) = CredentialStore::remembered_password(&login_username) {
                debug!("Prefilled password from system keychain");
                login_password = saved;
                password_from_keyring = true;
            }
        }

        Ok(Self {
            config,
            store,
            gateway: AuthGateway::new(),
            api,
            state: AppState::Normal,
            current_tab: Tab::Documents,
            status_message: None,
            auth_screen: AuthScreen::Login,
            auth_in_flight: false,
            login_focus: if login_username.is_empty() {
                LoginFocus::Username
            } else {
                LoginFocus::Password
            },
            login_username,
            login_password,
            password_from_keyring,
            register_focus: RegisterFocus::Email,
            register_email: String::new(),
            register_username: String::new(),
            register_password: String::new(),
            register_confirm: String::new(),
            pending_login: None,
            documents: Vec::new(),
            document_selection: 0,
            document_sort_column: DocumentSortColumn::Uploaded,
            document_sort_ascending: false,
            search_query: String::new(),
            shares: Vec::new(),
            share_selection: 0,
            audit_logs: Vec::new(),
            audit_selection: 0,
            audit_filter: AuditFilter::default(),
            upload_path: String::new(),
            upload_description: String::new(),
            upload_focus: UploadFocus::Path,
            upload_error: None,
            share_expiry_choice: DEFAULT_SHARE_EXPIRY_CHOICE,
            pending_share: None,
            pending_delete: None,
            pending_deactivate: None,
            share_info: None,
            task_rx,
            task_tx,
        })
    }

    // ===== Session lifecycle =====

    /// Restore a persisted credential, if any, and start validating it.
    /// Until the identity fetch lands the session reports as loading and
    /// the UI shows the checking screen instead of the login form.
    pub fn restore_session(&mut self) {
        match self.store.restore() {
            Restored::LoggedOut => {
                debug!("No persisted session to restore");
            }
            Restored::PendingIdentity => {
                let Some(token) = self.store.session().token().map(str::to_string) else {
                    return;
                };
                info!("Validating persisted session");
                self.api.set_token(token);
                let generation = self.gateway.begin_attempt();
                let api = self.api.clone();
                let tx = self.task_tx.clone();
                tokio::spawn(async move {
                    let outcome = AuthGateway::fetch_identity(&api).await;
                    Self::send_result(&tx, TaskResult::Identity { generation, outcome }).await;
                });
            }
        }
    }

    /// Validate the login form and spawn the login attempt
    pub fn submit_login(&mut self) {
        if self.auth_in_flight {
            return;
        }
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();
        if username.is_empty() || password.is_empty() {
            self.store
                .set_error("Username and password are required".to_string());
            return;
        }

        let generation = self.gateway.begin_attempt();
        self.pending_login = Some(PendingLogin {
            username: username.clone(),
            password: password.clone(),
            from_keyring: self.password_from_keyring,
        });
        self.auth_in_flight = true;

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let outcome = AuthGateway::login(&api, &username, &password).await;
            Self::send_result(&tx, TaskResult::Auth { generation, outcome }).await;
        });
    }

    /// Validate the registration form and spawn the register-then-login attempt
    pub fn submit_register(&mut self) {
        if self.auth_in_flight {
            return;
        }
        let email = self.register_email.trim().to_string();
        let username = self.register_username.trim().to_string();
        let password = self.register_password.clone();
        if let Err(message) =
            validate_registration(&email, &username, &password, &self.register_confirm)
        {
            self.store.set_error(message.to_string());
            return;
        }

        let generation = self.gateway.begin_attempt();
        self.pending_login = Some(PendingLogin {
            username: username.clone(),
            password: password.clone(),
            from_keyring: false,
        });
        self.auth_in_flight = true;

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let outcome = AuthGateway::register(&api, &email, &username, &password).await;
            Self::send_result(&tx, TaskResult::Auth { generation, outcome }).await;
        });
    }

    pub fn show_register_screen(&mut self) {
        self.auth_screen = AuthScreen::Register;
        self.register_focus = RegisterFocus::Email;
        // Carry the username over so it needn't be retyped
        if self.register_username.is_empty() {
            self.register_username = self.login_username.clone();
        }
    }

    pub fn show_login_screen(&mut self) {
        self.auth_screen = AuthScreen::Login;
        self.login_focus = LoginFocus::Username;
    }

    /// End the session on the user's request
    pub fn logout(&mut self) {
        info!("Logging out");
        self.gateway.logout(&mut self.store);
        self.api.clear_token();
        self.documents.clear();
        self.shares.clear();
        self.audit_logs.clear();
        self.share_info = None;
        self.status_message = None;
        self.state = AppState::Normal;
        self.auth_screen = AuthScreen::Login;
        self.login_focus = LoginFocus::Username;
        self.login_password.clear();
        self.password_from_keyring = false;
    }

    /// A protected request answered 401: the token aged out server-side.
    /// End the session and surface why the login form is back.
    fn handle_session_expired(&mut self) {
        warn!("Protected request returned 401; ending session");
        self.gateway.logout(&mut self.store);
        self.api.clear_token();
        self.documents.clear();
        self.shares.clear();
        self.audit_logs.clear();
        self.share_info = None;
        self.status_message = None;
        self.state = AppState::Normal;
        self.auth_screen = AuthScreen::Login;
        self.store
            .set_error("Session expired - please log in again".to_string());
    }

    // ===== Data refresh =====

    /// Fetch documents, shares and the audit page in parallel
    pub fn refresh_all(&mut self) {
        if self.store.session().token().is_none() {
            return;
        }
        let api = self.api.clone();
        let filter = self.audit_filter;
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            Self::execute_refresh(tx, api, filter).await;
        });
        self.status_message = Some("Refreshing...".to_string());
    }

    /// Re-fetch only the audit page (filter changes)
    pub fn refresh_audit(&mut self) {
        if self.store.session().token().is_none() {
            return;
        }
        let api = self.api.clone();
        let filter = self.audit_filter;
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.audit_logs(&filter).await;
            Self::send_api_result(&tx, "Audit log", result, TaskResult::AuditLogs).await;
        });
    }

    async fn execute_refresh(tx: mpsc::Sender<TaskResult>, api: ApiClient, filter: AuditFilter) {
        info!("Background refresh started");

        // Clones are cheap - the handles share one connection pool
        let api_documents = api.clone();
        let api_shares = api.clone();

        let (documents, shares, audit) = futures::future::join3(
            api_documents.list_documents(0, DOCUMENT_PAGE_SIZE),
            api_shares.list_shares(),
            api.audit_logs(&filter),
        )
        .await;

        Self::send_api_result(&tx, "Documents", documents, TaskResult::Documents).await;
        Self::send_api_result(&tx, "Shares", shares, TaskResult::Shares).await;
        Self::send_api_result(&tx, "Audit log", audit, TaskResult::AuditLogs).await;

        Self::send_result(&tx, TaskResult::RefreshComplete).await;
    }

    // ===== Document actions =====

    pub fn start_upload(&mut self) {
        self.state = AppState::UploadingDocument;
        self.upload_path.clear();
        self.upload_description.clear();
        self.upload_focus = UploadFocus::Path;
        self.upload_error = None;
    }

    /// Validate the upload form; on success close the overlay and spawn the upload
    pub fn submit_upload(&mut self) {
        let raw_path = self.upload_path.trim().to_string();
        if raw_path.is_empty() {
            self.upload_error = Some("Please select a file to upload".to_string());
            return;
        }
        let path = expand_tilde(&raw_path);
        let description = self.upload_description.trim();
        let description = (!description.is_empty()).then(|| description.to_string());

        self.state = AppState::Normal;
        self.status_message = Some(format!("Uploading {}...", raw_path));

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            Self::execute_upload(tx, api, path, description).await;
        });
    }

    async fn execute_upload(
        tx: mpsc::Sender<TaskResult>,
        api: ApiClient,
        path: PathBuf,
        description: Option<String>,
    ) {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "upload.bin".to_string());

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                Self::send_result(
                    &tx,
                    TaskResult::Error(format!("Could not read {}: {}", path.display(), e)),
                )
                .await;
                return;
            }
        };

        let result = api
            .upload_document(&file_name, bytes, description.as_deref())
            .await;
        Self::send_api_result(&tx, "Upload", result, TaskResult::Uploaded).await;
    }

    /// Ask for confirmation before deleting the selected document
    pub fn confirm_delete_document(&mut self) {
        if let Some(document) = self.selected_document() {
            self.pending_delete = Some((document.id, document.original_filename.clone()));
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub fn delete_pending_document(&mut self) {
        let Some((id, name)) = self.pending_delete.take() else {
            return;
        };
        self.state = AppState::Normal;
        self.status_message = Some(format!("Deleting {}...", name));

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.delete_document(id).await.map(|()| id);
            Self::send_api_result(&tx, "Delete", result, TaskResult::Deleted).await;
        });
    }

    // ===== Share actions =====

    /// Open the share overlay for the selected document
    pub fn start_share(&mut self) {
        if let Some(document) = self.selected_document() {
            self.pending_share = Some((document.id, document.original_filename.clone()));
            self.share_expiry_choice = DEFAULT_SHARE_EXPIRY_CHOICE;
            self.state = AppState::CreatingShare;
        }
    }

    pub fn next_share_expiry(&mut self) {
        self.share_expiry_choice = (self.share_expiry_choice + 1) % SHARE_EXPIRY_DAYS.len();
    }

    pub fn previous_share_expiry(&mut self) {
        self.share_expiry_choice =
            (self.share_expiry_choice + SHARE_EXPIRY_DAYS.len() - 1) % SHARE_EXPIRY_DAYS.len();
    }

    pub fn submit_share(&mut self) {
        let Some((document_id, name)) = self.pending_share.take() else {
            return;
        };
        self.state = AppState::Normal;
        let days = SHARE_EXPIRY_DAYS[self.share_expiry_choice];
        let expires_at = Utc::now() + Duration::days(days);
        self.status_message = Some(format!("Creating share link for {}...", name));

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.create_share(document_id, Some(expires_at)).await;
            Self::send_api_result(&tx, "Share", result, TaskResult::ShareCreated).await;
        });
    }

    /// Ask for confirmation before deactivating the selected share link
    pub fn confirm_deactivate_share(&mut self) {
        if let Some(share) = self.shares.get(self.share_selection) {
            if !share.is_active {
                self.status_message = Some("Share link is already inactive".to_string());
                return;
            }
            self.pending_deactivate = Some(share.id);
            self.state = AppState::ConfirmingDeactivate;
        }
    }

    pub fn deactivate_pending_share(&mut self) {
        let Some(id) = self.pending_deactivate.take() else {
            return;
        };
        self.state = AppState::Normal;

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.delete_share(id).await.map(|()| id);
            Self::send_api_result(&tx, "Deactivate", result, TaskResult::ShareDeactivated).await;
        });
    }

    /// Fetch the public view of the selected share link. The overlay opens
    /// when the metadata lands, exactly what a recipient of the URL sees.
    pub fn open_share_info(&mut self) {
        let Some(share) = self.shares.get(self.share_selection) else {
            return;
        };
        let url = share.public_url(&self.config.share_base_url);
        let token = share.token.clone();
        self.status_message = Some("Fetching share info...".to_string());

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.shared_document_info(&token).await;
            Self::send_api_result(&tx, "Share info", result, |info| TaskResult::ShareInfo {
                url,
                token,
                info,
            })
            .await;
        });
    }

    /// Save the overlay's document to the user's download directory
    pub fn download_share_info(&mut self) {
        let Some(ref view) = self.share_info else {
            return;
        };
        let token = view.token.clone();
        let file_name = view.info.original_filename.clone();
        self.status_message = Some(format!("Downloading {}...", file_name));

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            Self::execute_download(tx, api, token, file_name).await;
        });
    }

    async fn execute_download(
        tx: mpsc::Sender<TaskResult>,
        api: ApiClient,
        token: String,
        file_name: String,
    ) {
        let bytes = match api.download_shared_document(&token).await {
            Ok(bytes) => bytes,
            Err(e) => {
                Self::send_result(&tx, TaskResult::Error(format!("Download: {}", e))).await;
                return;
            }
        };

        let dir = dirs::download_dir().unwrap_or_else(std::env::temp_dir);
        let path = unique_download_path(&dir, &file_name);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Self::send_result(&tx, TaskResult::Downloaded(path)).await,
            Err(e) => {
                let message = format!("Could not write {}: {}", path.display(), e);
                Self::send_result(&tx, TaskResult::Error(message)).await;
            }
        }
    }

    // ===== Audit filters =====

    pub fn cycle_audit_action(&mut self) {
        self.audit_filter.action = self.audit_filter.action.next();
        self.audit_filter.skip = 0;
        self.audit_selection = 0;
        self.refresh_audit();
    }

    pub fn cycle_audit_resource(&mut self) {
        self.audit_filter.resource = self.audit_filter.resource.next();
        self.audit_filter.skip = 0;
        self.audit_selection = 0;
        self.refresh_audit();
    }

    pub fn reset_audit_filter(&mut self) {
        self.audit_filter = AuditFilter::default();
        self.audit_selection = 0;
        self.refresh_audit();
    }

    /// Page forward through the audit trail. A short page means the server
    /// has nothing further, so the request is skipped.
    pub fn next_audit_page(&mut self) {
        if (self.audit_logs.len() as u32) < self.audit_filter.limit {
            return;
        }
        self.audit_filter.skip += self.audit_filter.limit;
        self.audit_selection = 0;
        self.refresh_audit();
    }

    pub fn previous_audit_page(&mut self) {
        if self.audit_filter.skip == 0 {
            return;
        }
        self.audit_filter.skip = self.audit_filter.skip.saturating_sub(self.audit_filter.limit);
        self.audit_selection = 0;
        self.refresh_audit();
    }

    // ===== Background task plumbing =====

    /// Drain any completed background task results without blocking
    pub async fn check_background_tasks(&mut self) {
        while let Ok(result) = self.task_rx.try_recv() {
            self.process_task_result(result);
        }
    }

    fn process_task_result(&mut self, result: TaskResult) {
        // Results carrying account data are dropped once the session ends;
        // a refresh can still be in flight when the user logs out.
        let authenticated = self.store.session().is_authenticated();

        match result {
            TaskResult::Auth {
                generation,
                outcome,
            } => self.process_auth_result(generation, outcome),

            TaskResult::Identity {
                generation,
                outcome,
            } => match self.gateway.apply_rehydrate(&mut self.store, generation, outcome) {
                Applied::LoggedIn => {
                    if let Some(token) = self.store.session().token().map(str::to_string) {
                        self.api.set_token(token);
                    }
                    info!("Session restored");
                    self.refresh_all();
                }
                Applied::LoggedOut => {
                    debug!("Persisted session no longer valid");
                    self.api.clear_token();
                }
                _ => {}
            },

            TaskResult::Documents(documents) if authenticated => {
                debug!(count = documents.len(), "Documents updated");
                self.documents = documents;
                self.clamp_selections();
            }

            TaskResult::Shares(shares) if authenticated => {
                debug!(count = shares.len(), "Shares updated");
                self.shares = shares;
                self.clamp_selections();
            }

            TaskResult::AuditLogs(audit_logs) if authenticated => {
                debug!(count = audit_logs.len(), "Audit log updated");
                self.audit_logs = audit_logs;
                self.clamp_selections();
            }

            TaskResult::Uploaded(document) if authenticated => {
                self.status_message = Some(format!("Uploaded {}", document.original_filename));
                self.refresh_all();
            }

            TaskResult::Deleted(id) if authenticated => {
                self.documents.retain(|d| d.id != id);
                self.clamp_selections();
                self.status_message = Some("Document deleted".to_string());
                // The server deactivates the document's share links too
                self.refresh_all();
            }

            TaskResult::ShareCreated(share) if authenticated => {
                let url = share.public_url(&self.config.share_base_url);
                self.status_message = Some(format!("Share link: {}", url));
                self.shares.insert(0, share);
                self.share_selection = 0;
            }

            TaskResult::ShareDeactivated(id) if authenticated => {
                if let Some(share) = self.shares.iter_mut().find(|s| s.id == id) {
                    share.is_active = false;
                }
                self.status_message = Some("Share link deactivated".to_string());
            }

            TaskResult::ShareInfo { url, token, info } if authenticated => {
                self.status_message = None;
                // Only open on the base screen; the user may have moved on
                if self.state == AppState::Normal {
                    self.share_info = Some(ShareInfoView { url, token, info });
                    self.state = AppState::ViewingShareInfo;
                }
            }

            TaskResult::Downloaded(path) => {
                info!(path = %path.display(), "Shared document downloaded");
                self.status_message = Some(format!("Saved to {}", path.display()));
            }

            TaskResult::SessionExpired => {
                if authenticated {
                    self.handle_session_expired();
                }
            }

            TaskResult::RefreshComplete => {
                debug!("Background refresh complete");
                // Keep error messages visible; clear transient progress text
                if let Some(ref message) = self.status_message {
                    if !message.starts_with("Error:") && !message.starts_with("Share link:") {
                        self.status_message = None;
                    }
                }
            }

            TaskResult::Error(message) => {
                self.status_message = Some(format!("Error: {}", message));
            }

            // Data results that raced a logout
            _ => {}
        }
    }

    fn process_auth_result(&mut self, generation: u64, outcome: Result<LoginSuccess, AuthError>) {
        let was_invalid = matches!(outcome, Err(AuthError::InvalidCredentials));
        let applied = self.gateway.apply_login(&mut self.store, generation, outcome);
        if applied == Applied::Stale {
            // A newer attempt owns pending_login and auth_in_flight now
            return;
        }
        self.auth_in_flight = false;
        let pending = self.pending_login.take();

        match applied {
            Applied::LoggedIn => {
                if let Some(token) = self.store.session().token().map(str::to_string) {
                    self.api.set_token(token);
                }
                if let Some(pending) = pending {
                    if let Err(e) = CredentialStore::store(&pending.username, &pending.password) {
                        warn!(error = %e, "Failed to store password in keychain");
                    }
                    self.config.last_username = Some(pending.username);
                    if let Err(e) = self.config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                }
                self.login_password.clear();
                self.register_password.clear();
                self.register_confirm.clear();
                self.password_from_keyring = false;
                self.current_tab = Tab::Documents;
                self.status_message = None;
                info!("Login successful");
                self.refresh_all();
            }
            Applied::Failed(_) => {
                // The message is already on the session for inline display.
                // A rejected remembered password is stale: drop it so the
                // next start doesn't prefill garbage.
                if was_invalid {
                    if let Some(pending) = pending {
                        if pending.from_keyring {
                            if let Err(e) = CredentialStore::forget(&pending.username) {
                                warn!(error = %e, "Failed to remove stale password from keychain");
                            }
                            self.login_password.clear();
                            self.password_from_keyring = false;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    async fn send_result(tx: &mpsc::Sender<TaskResult>, result: TaskResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to queue background task result");
        }
    }

    /// Forward an API result, folding 401s into `SessionExpired`
    async fn send_api_result<T, F>(
        tx: &mpsc::Sender<TaskResult>,
        name: &str,
        result: Result<T, ApiError>,
        wrap: F,
    ) where
        F: FnOnce(T) -> TaskResult,
    {
        match result {
            Ok(data) => {
                Self::send_result(tx, wrap(data)).await;
            }
            Err(ApiError::Unauthorized) => {
                Self::send_result(tx, TaskResult::SessionExpired).await;
            }
            Err(e) => {
                error!(error = %e, "{} request failed", name);
                Self::send_result(tx, TaskResult::Error(format!("{}: {}", name, e))).await;
            }
        }
    }

    // ===== Table state =====

    /// Documents filtered by the search query and sorted by the active column
    pub fn get_sorted_documents(&self) -> Vec<&Document> {
        filter_and_sort_documents(
            &self.documents,
            &self.search_query,
            self.document_sort_column,
            self.document_sort_ascending,
        )
    }

    pub fn selected_document(&self) -> Option<&Document> {
        self.get_sorted_documents()
            .get(self.document_selection)
            .copied()
    }

    pub fn selected_share(&self) -> Option<&ShareLink> {
        self.shares.get(self.share_selection)
    }

    pub fn selected_audit_log(&self) -> Option<&AuditLog> {
        self.audit_logs.get(self.audit_selection)
    }

    /// Original filename for a document id, for share rows
    pub fn document_name(&self, document_id: i64) -> Option<&str> {
        self.documents
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| d.original_filename.as_str())
    }

    /// Flip direction on the active column, or switch columns.
    /// Names start ascending; size and upload time start with the big/new end.
    pub fn toggle_document_sort(&mut self, column: DocumentSortColumn) {
        if self.document_sort_column == column {
            self.document_sort_ascending = !self.document_sort_ascending;
        } else {
            self.document_sort_column = column;
            self.document_sort_ascending = column == DocumentSortColumn::Name;
        }
        self.document_selection = 0;
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.document_selection = 0;
    }

    fn current_list_len(&self) -> usize {
        match self.current_tab {
            Tab::Documents => self.get_sorted_documents().len(),
            Tab::Shares => self.shares.len(),
            Tab::Audit => self.audit_logs.len(),
        }
    }

    fn selection_mut(&mut self) -> &mut usize {
        match self.current_tab {
            Tab::Documents => &mut self.document_selection,
            Tab::Shares => &mut self.share_selection,
            Tab::Audit => &mut self.audit_selection,
        }
    }

    pub fn move_selection_down(&mut self, amount: usize) {
        let len = self.current_list_len();
        if len == 0 {
            return;
        }
        let selection = self.selection_mut();
        *selection = (*selection + amount).min(len - 1);
    }

    pub fn move_selection_up(&mut self, amount: usize) {
        let selection = self.selection_mut();
        *selection = selection.saturating_sub(amount);
    }

    pub fn select_first(&mut self) {
        *self.selection_mut() = 0;
    }

    pub fn select_last(&mut self) {
        let len = self.current_list_len();
        if len == 0 {
            return;
        }
        *self.selection_mut() = len - 1;
    }

    fn clamp_selections(&mut self) {
        let documents = self.get_sorted_documents().len();
        self.document_selection = self.document_selection.min(documents.saturating_sub(1));
        self.share_selection = self
            .share_selection
            .min(self.shares.len().saturating_sub(1));
        self.audit_selection = self
            .audit_selection
            .min(self.audit_logs.len().saturating_sub(1));
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Character filter for text input fields: printable only
pub fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Client-side registration checks; nothing reaches the network until
/// these pass
fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
    confirm: &str,
) -> Result<(), &'static str> {
    if email.is_empty() || username.is_empty() || password.is_empty() {
        return Err("Email, username and password are required");
    }
    if password != confirm {
        return Err("Passwords do not match");
    }
    Ok(())
}

/// Expand a leading `~/` to the home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Pick a path in `dir` that does not clobber an existing file, adding
/// a " (n)" counter before the extension the way browsers name downloads
fn unique_download_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let extension = name.extension().and_then(|e| e.to_str());

    let mut n = 1u32;
    loop {
        let numbered = match extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(numbered);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn document_matches_search(document: &Document, query: &str) -> bool {
    contains_ignore_case(&document.original_filename, query)
        || document
            .description
            .as_deref()
            .is_some_and(|d| contains_ignore_case(d, query))
        || contains_ignore_case(document.kind(), query)
}

/// Filter documents by a search query and sort them by the given column.
/// Ties break on the display name so orderings stay stable across refreshes.
pub fn filter_and_sort_documents<'a>(
    documents: &'a [Document],
    query: &str,
    column: DocumentSortColumn,
    ascending: bool,
) -> Vec<&'a Document> {
    let mut sorted: Vec<&Document> = if query.is_empty() {
        documents.iter().collect()
    } else {
        let query = query.to_lowercase();
        documents
            .iter()
            .filter(|d| document_matches_search(d, &query))
            .collect()
    };

    sorted.sort_by(|a, b| {
        let by_name = cmp_ignore_case(&a.original_filename, &b.original_filename);
        let ordering = match column {
            DocumentSortColumn::Name => by_name,
            DocumentSortColumn::Size => a.file_size.cmp(&b.file_size).then(by_name),
            DocumentSortColumn::Uploaded => a.created_at.cmp(&b.created_at).then(by_name),
        };
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });

    sorted
}
