//! DocSecure TUI - a terminal client for the DocSecure document service.
//!
//! Keyboard-driven interface for uploading and sharing documents and for
//! reviewing the account audit trail.

mod app;
mod ui;
mod utils;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docsecure_core::api::ApiClient;
use docsecure_core::auth::{AuthGateway, CredentialStore, SessionStore};
use docsecure_core::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG to control the level (e.g. RUST_LOG=debug). Logs go to
    // stderr so they don't tear the alternate screen.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // CLI commands that bypass the TUI
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--login" {
        return cli_login().await;
    }
    if args.len() > 1 && args[1] == "--logout" {
        return cli_logout();
    }

    init_tracing();
    info!("DocSecure TUI starting");

    let mut app = App::new()?;
    app.restore_session();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("DocSecure TUI shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks().await;

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

/// Validate credentials against the server and remember them, so the next
/// TUI start goes straight to the main screen.
async fn cli_login() -> Result<()> {
    let mut config = Config::load()?;
    let api = ApiClient::new(&config.api_base_url)?;

    eprint!("Username: ");
    io::stderr().flush()?;
    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        anyhow::bail!("Username must not be empty");
    }
    let password = rpassword::prompt_password("Password: ")?;

    let login = AuthGateway::login(&api, &username, &password).await?;
    let display_name = login.identity.username.clone();

    let mut store = SessionStore::new(config.cache_dir()?);
    store.set(login.credential, login.identity)?;
    CredentialStore::store(&username, &password)?;
    config.last_username = Some(username);
    config.save()?;

    eprintln!("Logged in as {} - session saved", display_name);
    Ok(())
}

/// Drop the persisted session and any remembered password
fn cli_logout() -> Result<()> {
    let config = Config::load()?;
    let mut store = SessionStore::new(config.cache_dir()?);
    store.clear();
    if let Some(ref username) = config.last_username {
        if CredentialStore::forget(username).is_ok() {
            eprintln!("Removed remembered password for {}", username);
        }
    }
    eprintln!("Logged out");
    Ok(())
}
