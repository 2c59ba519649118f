use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use docsecure_core::auth::{guard, GuardDecision};

use crate::app::{
    App, AppState, AuthScreen, LoginFocus, RegisterFocus, Tab, UploadFocus, SHARE_EXPIRY_DAYS,
};
use crate::utils::{format_date, truncate_string};

use super::styles;
use super::tabs::{audit, documents, shares};

// Box-drawing logo, shared by the auth screens and overlays
const LOGO: [&str; 3] = [
    "╔╦╗╔═╗╔═╗╔═╗╔═╗╔═╗╦ ╦╦═╗╔═╗",
    " ║║║ ║║  ╚═╗║╣ ║  ║ ║╠╦╝║╣ ",
    "╚╩╝╚═╝╚═╝╚═╝╚═╝╚═╝╚═╝╩╚═╚═╝",
];

/// Width of the text inputs on the auth screens
const AUTH_FIELD_WIDTH: usize = 24;

/// Width of the text inputs on the upload overlay
const UPLOAD_FIELD_WIDTH: usize = 44;

/// Top-level render dispatch, keyed off the session state: a loading
/// session gets the checking screen, an anonymous one the auth screens,
/// an authenticated one the main application.
pub fn render(frame: &mut Frame, app: &App) {
    match guard::evaluate(app.store.session()) {
        GuardDecision::Checking => render_checking_screen(frame),
        GuardDecision::RedirectToLogin => match app.auth_screen {
            AuthScreen::Login => render_login_screen(frame, app),
            AuthScreen::Register => render_register_screen(frame, app),
        },
        GuardDecision::Allow => render_main_screen(frame, app),
    }
}

// ===== Auth screens =====

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|row| {
            Line::from(Span::styled(
                format!("{}{}", " ".repeat(9), row),
                styles::title_style(),
            ))
        })
        .collect()
}

/// One "Label: [value▌]" form line. Labels are right-aligned so the
/// brackets line up across fields.
fn form_field(label: &str, value: &str, width: usize, focused: bool, masked: bool) -> Line<'static> {
    let shown: String = if masked {
        "*".repeat(value.chars().count().min(width))
    } else if value.chars().count() > width {
        // Keep the tail visible while typing long values
        let chars: Vec<char> = value.chars().collect();
        chars[chars.len() - width..].iter().collect()
    } else {
        value.to_string()
    };

    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };

    Line::from(vec![
        Span::raw("   "),
        Span::styled(format!("{:>12}: [", label), styles::muted_style()),
        Span::styled(format!("{:<width$}{}", shown, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn form_button(label: &str, focused: bool, indent: usize) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let text = if focused {
        format!(" ▶ {} ◀ ", label)
    } else {
        format!("   {}   ", label)
    };
    Line::from(vec![
        Span::raw(" ".repeat(indent)),
        Span::raw("["),
        Span::styled(text, style),
        Span::raw("]"),
    ])
}

fn form_link(text: &str, focused: bool, indent: usize) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::muted_style()
    };
    Line::from(vec![
        Span::raw(" ".repeat(indent)),
        Span::styled(text.to_string(), style),
    ])
}

/// Shown while a restored credential is being validated against the server
fn render_checking_screen(frame: &mut Frame) {
    let area = centered_rect_fixed(48, 7, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("{}Checking session...", " ".repeat(13)),
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_login_screen(frame: &mut Frame, app: &App) {
    // The spinner and the last error share the message slot; a fresh
    // attempt always clears the old error from view.
    let message = if app.auth_in_flight {
        Some(("Signing in...".to_string(), styles::muted_style()))
    } else {
        app.store
            .session()
            .last_error()
            .map(|e| (e.to_string(), styles::error_style()))
    };

    let height = if message.is_some() { 14 } else { 12 };
    let area = centered_rect_fixed(48, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));
    lines.push(form_field(
        "Username",
        &app.login_username,
        AUTH_FIELD_WIDTH,
        app.login_focus == LoginFocus::Username,
        false,
    ));
    lines.push(form_field(
        "Password",
        &app.login_password,
        AUTH_FIELD_WIDTH,
        app.login_focus == LoginFocus::Password,
        true,
    ));
    lines.push(Line::from(""));
    lines.push(form_button(
        "Sign in",
        app.login_focus == LoginFocus::Button,
        15,
    ));
    lines.push(Line::from(""));
    lines.push(form_link(
        "Need an account? Create one",
        app.login_focus == LoginFocus::RegisterLink,
        9,
    ));
    if let Some((text, style)) = message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("   {}", text), style)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_register_screen(frame: &mut Frame, app: &App) {
    let message = if app.auth_in_flight {
        Some(("Creating account...".to_string(), styles::muted_style()))
    } else {
        app.store
            .session()
            .last_error()
            .map(|e| (e.to_string(), styles::error_style()))
    };

    let height = if message.is_some() { 16 } else { 14 };
    let area = centered_rect_fixed(48, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));
    lines.push(form_field(
        "Email",
        &app.register_email,
        AUTH_FIELD_WIDTH,
        app.register_focus == RegisterFocus::Email,
        false,
    ));
    lines.push(form_field(
        "Username",
        &app.register_username,
        AUTH_FIELD_WIDTH,
        app.register_focus == RegisterFocus::Username,
        false,
    ));
    lines.push(form_field(
        "Password",
        &app.register_password,
        AUTH_FIELD_WIDTH,
        app.register_focus == RegisterFocus::Password,
        true,
    ));
    lines.push(form_field(
        "Confirm",
        &app.register_confirm,
        AUTH_FIELD_WIDTH,
        app.register_focus == RegisterFocus::Confirm,
        true,
    ));
    lines.push(Line::from(""));
    lines.push(form_button(
        "Create account",
        app.register_focus == RegisterFocus::Button,
        12,
    ));
    lines.push(Line::from(""));
    lines.push(form_link(
        "Have an account? Sign in",
        app.register_focus == RegisterFocus::LoginLink,
        10,
    ));
    if let Some((text, style)) = message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("   {}", text), style)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ===== Main screen =====

fn render_main_screen(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    match app.current_tab {
        Tab::Documents => documents::render(frame, app, chunks[2]),
        Tab::Shares => shares::render(frame, app, chunks[2]),
        Tab::Audit => audit::render(frame, app, chunks[2]),
    }
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::UploadingDocument => render_upload_overlay(frame, app),
        AppState::CreatingShare => render_share_overlay(frame, app),
        AppState::ViewingShareInfo => render_share_info_overlay(frame, app),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::ConfirmingDeactivate => render_deactivate_overlay(frame),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  DocSecure";
    let right = match app.store.session().username() {
        Some(username) => format!("{} | [?] Help", username),
        None => "[?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + right.len() + 4),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let main_tabs = [
        ("[1] Documents", app.current_tab == Tab::Documents),
        ("[2] Shares", app.current_tab == Tab::Shares),
        ("[3] Audit Log", app.current_tab == Tab::Audit),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, selected)) in main_tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(*label, styles::tab_style(*selected)));
    }

    // Audit filters live on the right of the tab bar
    if app.current_tab == Tab::Audit {
        let filters = format!(
            "[a]ction: {} | [r]esource: {}",
            app.audit_filter.action.label(),
            app.audit_filter.resource.label(),
        );
        let main_width: usize = spans.iter().map(|s| s.content.len()).sum();
        let padding = (area.width as usize).saturating_sub(main_width + filters.len() + 2);
        spans.push(Span::raw(" ".repeat(padding)));
        spans.push(Span::styled(filters, styles::muted_style()));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if let Some(ref message) = app.status_message {
        format!(" {} ", message)
    } else if let Some(credential) = app.store.session().credential() {
        format!(" Session expires in {} min ", credential.minutes_until_expiry())
    } else {
        String::new()
    };

    let shortcuts = match app.current_tab {
        Tab::Documents => "[u]pload | [s]hare | [x] delete | [q]uit",
        Tab::Shares => "[Enter] info | [x] deactivate | [q]uit",
        Tab::Audit => "[a]/[r] filter | [n]/[p] page | [c]lear | [q]uit",
    };
    let right_text = format!(" {} ", shortcuts);

    // Center text on the Shares tab - the selected link's URL
    let center_text = if app.current_tab == Tab::Shares {
        app.selected_share()
            .map(|share| share.public_url(&app.config.share_base_url))
            .unwrap_or_default()
    } else {
        String::new()
    };

    let width = area.width as usize;

    let status_line = if center_text.is_empty() {
        let padding = width
            .saturating_sub(left_text.len())
            .saturating_sub(right_text.len());
        Line::from(vec![
            Span::styled(left_text, styles::muted_style()),
            Span::raw(" ".repeat(padding)),
            Span::styled(right_text, styles::muted_style()),
        ])
    } else {
        // Center the URL absolutely, regardless of left/right content
        let center_start = width.saturating_sub(center_text.len()) / 2;
        let left_pad = center_start.saturating_sub(left_text.len());
        let right_start = center_start + center_text.len();
        let right_pad = width
            .saturating_sub(right_start)
            .saturating_sub(right_text.len());
        Line::from(vec![
            Span::styled(left_text, styles::muted_style()),
            Span::raw(" ".repeat(left_pad)),
            Span::styled(center_text, styles::highlight_style()),
            Span::raw(" ".repeat(right_pad)),
            Span::styled(right_text, styles::muted_style()),
        ])
    };

    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

// ===== Overlays =====

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(54, 33, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let key = styles::help_key_style();
    let desc = styles::help_desc_style();

    let help_text = vec![
        Line::from(Span::styled(
            format!("{}{}", " ".repeat(12), LOGO[0]),
            styles::title_style(),
        )),
        Line::from(Span::styled(
            format!("{}{}", " ".repeat(12), LOGO[1]),
            styles::title_style(),
        )),
        Line::from(Span::styled(
            format!("{}{}", " ".repeat(12), LOGO[2]),
            styles::title_style(),
        )),
        Line::from(Span::styled(
            format!("                  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  1-3       ", key),
            Span::styled("Switch tabs", desc),
        ]),
        Line::from(vec![
            Span::styled("  ←/→ Tab   ", key),
            Span::styled("Prev/next tab", desc),
        ]),
        Line::from(vec![
            Span::styled("  ↑/↓ j/k   ", key),
            Span::styled("Navigate list", desc),
        ]),
        Line::from(vec![
            Span::styled("  PgUp/PgDn ", key),
            Span::styled("Jump by page, Home/End to the ends", desc),
        ]),
        Line::from(vec![
            Span::styled("  R         ", key),
            Span::styled("Refresh everything from the server", desc),
        ]),
        Line::from(vec![
            Span::styled("  L         ", key),
            Span::styled("Log out", desc),
        ]),
        Line::from(vec![
            Span::styled("  q         ", key),
            Span::styled("Quit", desc),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Documents", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  /         ", key),
            Span::styled("Search name, description and type", desc),
        ]),
        Line::from(vec![
            Span::styled("  u         ", key),
            Span::styled("Upload a file", desc),
        ]),
        Line::from(vec![
            Span::styled("  s         ", key),
            Span::styled("Create a share link", desc),
        ]),
        Line::from(vec![
            Span::styled("  x         ", key),
            Span::styled("Delete the selected document", desc),
        ]),
        Line::from(vec![
            Span::styled("  n/z/t     ", key),
            Span::styled("Sort by name/size/upload time", desc),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Shares", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  Enter     ", key),
            Span::styled("Open the recipient's view of the link", desc),
        ]),
        Line::from(vec![
            Span::styled("  x         ", key),
            Span::styled("Deactivate the selected link", desc),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Audit Log", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  a/r       ", key),
            Span::styled("Cycle action/resource filter", desc),
        ]),
        Line::from(vec![
            Span::styled("  n/p       ", key),
            Span::styled("Next/previous page", desc),
        ]),
        Line::from(vec![
            Span::styled("  c         ", key),
            Span::styled("Clear the filters", desc),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", key),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", key),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_upload_overlay(frame: &mut Frame, app: &App) {
    let height = if app.upload_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(68, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(" Upload document", styles::highlight_style())),
        Line::from(""),
    ];
    lines.push(form_field(
        "File path",
        &app.upload_path,
        UPLOAD_FIELD_WIDTH,
        app.upload_focus == UploadFocus::Path,
        false,
    ));
    lines.push(form_field(
        "Description",
        &app.upload_description,
        UPLOAD_FIELD_WIDTH,
        app.upload_focus == UploadFocus::Description,
        false,
    ));
    lines.push(Line::from(""));
    lines.push(form_button(
        "Upload",
        app.upload_focus == UploadFocus::Button,
        26,
    ));
    if let Some(ref error) = app.upload_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("   {}", error),
            styles::error_style(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "   Tab next field - Enter submit - Esc cancel",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_share_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(56, 11, frame.area());
    frame.render_widget(Clear, area);

    let name = app
        .pending_share
        .as_ref()
        .map(|(_, name)| truncate_string(name, 46))
        .unwrap_or_default();
    let days = SHARE_EXPIRY_DAYS[app.share_expiry_choice];
    let expiry_label = if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    };

    let lines = vec![
        Line::from(Span::styled(" Share document", styles::highlight_style())),
        Line::from(""),
        Line::from(format!("   {}", name)),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Expires in:  ", styles::muted_style()),
            Span::styled("◀ ", styles::muted_style()),
            Span::styled(format!("{:^8}", expiry_label), styles::selected_style()),
            Span::styled(" ▶", styles::muted_style()),
        ]),
        Line::from(""),
        form_button("Create link", true, 18),
        Line::from(""),
        Line::from(Span::styled(
            "   ←/→ change expiry - Enter create - Esc cancel",
            styles::muted_style(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// What a recipient of the share URL sees, plus a download shortcut
fn render_share_info_overlay(frame: &mut Frame, app: &App) {
    let Some(ref view) = app.share_info else {
        return;
    };

    let area = centered_rect_fixed(68, 13, frame.area());
    frame.render_widget(Clear, area);

    let description = view.info.description.as_deref().unwrap_or("No description");

    let lines = vec![
        Line::from(Span::styled(" Shared document", styles::highlight_style())),
        Line::from(""),
        Line::from(Span::styled(
            format!("   {}", truncate_string(&view.info.original_filename, 56)),
            styles::title_style(),
        )),
        Line::from(Span::styled(
            format!("   {}", truncate_string(description, 56)),
            styles::list_item_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Shared by:  ", styles::muted_style()),
            Span::raw(view.info.shared_by.clone()),
        ]),
        Line::from(vec![
            Span::styled("   Created:    ", styles::muted_style()),
            Span::raw(format_date(&view.info.created_at)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("   {}", truncate_string(&view.url, 62)),
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   [d]", styles::help_key_style()),
            Span::styled(" download - ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(56, 9, frame.area());
    frame.render_widget(Clear, area);

    let name = app
        .pending_delete
        .as_ref()
        .map(|(_, name)| truncate_string(name, 46))
        .unwrap_or_default();

    let lines = vec![
        Line::from(Span::styled(" Delete document", styles::error_style())),
        Line::from(""),
        Line::from(format!("   {}", name)),
        Line::from(""),
        Line::from(Span::styled(
            "   Its share links stop working immediately.",
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_deactivate_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(56, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(
            " Deactivate share link",
            styles::error_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "   Recipients lose access immediately.",
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to deactivate, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(48, 9, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "     Are you sure you want to quit?",
        styles::highlight_style(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("     Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(" to quit, ", styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
