//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. Dispatch follows
//! the same route the renderer takes: the session decides between the auth
//! screens and the main screen, then overlay states capture input before
//! the global and per-tab keys.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use docsecure_core::auth::{guard, GuardDecision};

use crate::app::{
    is_valid_input_char, App, AppState, AuthScreen, DocumentSortColumn, LoginFocus, RegisterFocus,
    Tab, UploadFocus, MAX_DESCRIPTION_LENGTH, MAX_EMAIL_LENGTH, MAX_PASSWORD_LENGTH,
    MAX_PATH_LENGTH, MAX_SEARCH_LENGTH, MAX_USERNAME_LENGTH, PAGE_SCROLL_SIZE,
};

/// Append a character to a bounded text field
fn push_bounded(field: &mut String, c: char, limit: usize) {
    if field.len() < limit && is_valid_input_char(c) {
        field.push(c);
    }
}

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Ctrl+C quits from anywhere
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.state = AppState::Quitting;
        return Ok(true);
    }

    match guard::evaluate(app.store.session()) {
        GuardDecision::Checking => {
            // Only quitting makes sense while the session check is in flight
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            Ok(false)
        }
        GuardDecision::RedirectToLogin => match app.auth_screen {
            AuthScreen::Login => handle_login_input(app, key),
            AuthScreen::Register => handle_register_input(app, key),
        },
        GuardDecision::Allow => handle_main_input(app, key),
    }
}

// ===== Auth screens =====

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => app.login_focus = app.login_focus.next(),
        KeyCode::Up | KeyCode::BackTab => app.login_focus = app.login_focus.prev(),
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.submit_login(),
            LoginFocus::RegisterLink => app.show_register_screen(),
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
                // A remembered password belongs to the username it was saved for
                if app.password_from_keyring {
                    app.login_password.clear();
                    app.password_from_keyring = false;
                }
            }
            LoginFocus::Password => {
                app.login_password.pop();
                app.password_from_keyring = false;
            }
            _ => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                push_bounded(&mut app.login_username, c, MAX_USERNAME_LENGTH);
                if app.password_from_keyring {
                    app.login_password.clear();
                    app.password_from_keyring = false;
                }
            }
            LoginFocus::Password => {
                if app.password_from_keyring {
                    // Typing replaces the hidden prefill instead of extending it
                    app.login_password.clear();
                    app.password_from_keyring = false;
                }
                push_bounded(&mut app.login_password, c, MAX_PASSWORD_LENGTH);
            }
            _ => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_register_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => app.show_login_screen(),
        KeyCode::Down | KeyCode::Tab => app.register_focus = app.register_focus.next(),
        KeyCode::Up | KeyCode::BackTab => app.register_focus = app.register_focus.prev(),
        KeyCode::Enter => match app.register_focus {
            RegisterFocus::Email => app.register_focus = RegisterFocus::Username,
            RegisterFocus::Username => app.register_focus = RegisterFocus::Password,
            RegisterFocus::Password => app.register_focus = RegisterFocus::Confirm,
            RegisterFocus::Confirm | RegisterFocus::Button => app.submit_register(),
            RegisterFocus::LoginLink => app.show_login_screen(),
        },
        KeyCode::Backspace => {
            match app.register_focus {
                RegisterFocus::Email => app.register_email.pop(),
                RegisterFocus::Username => app.register_username.pop(),
                RegisterFocus::Password => app.register_password.pop(),
                RegisterFocus::Confirm => app.register_confirm.pop(),
                _ => None,
            };
        }
        KeyCode::Char(c) => match app.register_focus {
            RegisterFocus::Email => push_bounded(&mut app.register_email, c, MAX_EMAIL_LENGTH),
            RegisterFocus::Username => {
                push_bounded(&mut app.register_username, c, MAX_USERNAME_LENGTH)
            }
            RegisterFocus::Password => {
                push_bounded(&mut app.register_password, c, MAX_PASSWORD_LENGTH)
            }
            RegisterFocus::Confirm => {
                push_bounded(&mut app.register_confirm, c, MAX_PASSWORD_LENGTH)
            }
            _ => {}
        },
        _ => {}
    }
    Ok(false)
}

// ===== Main screen =====

fn handle_main_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Overlay states capture input first
    match app.state {
        AppState::ShowingHelp => {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.delete_pending_document();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.pending_delete = None;
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDeactivate => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.deactivate_pending_share();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.pending_deactivate = None;
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ViewingShareInfo => {
            match key.code {
                KeyCode::Char('d') => app.download_share_info(),
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                    app.share_info = None;
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Searching => return handle_search_input(app, key),
        AppState::UploadingDocument => return handle_upload_input(app, key),
        AppState::CreatingShare => return handle_share_input(app, key),
        AppState::Normal | AppState::Quitting => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('1') => app.current_tab = Tab::Documents,
        KeyCode::Char('2') => app.current_tab = Tab::Shares,
        KeyCode::Char('3') => app.current_tab = Tab::Audit,
        KeyCode::Left | KeyCode::BackTab => app.current_tab = app.current_tab.prev(),
        KeyCode::Right | KeyCode::Tab => app.current_tab = app.current_tab.next(),
        KeyCode::Char('R') => app.refresh_all(),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection_down(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection_up(1),
        KeyCode::PageDown => app.move_selection_down(PAGE_SCROLL_SIZE),
        KeyCode::PageUp => app.move_selection_up(PAGE_SCROLL_SIZE),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::Esc => {
            if !app.search_query.is_empty() {
                app.clear_search();
            }
        }
        _ => match app.current_tab {
            Tab::Documents => handle_documents_input(app, key),
            Tab::Shares => handle_shares_input(app, key),
            Tab::Audit => handle_audit_input(app, key),
        },
    }

    Ok(false)
}

fn handle_documents_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
            app.search_query.clear();
            app.document_selection = 0;
        }
        KeyCode::Char('u') => app.start_upload(),
        KeyCode::Char('s') => app.start_share(),
        KeyCode::Char('x') | KeyCode::Delete => app.confirm_delete_document(),
        KeyCode::Char('n') => app.toggle_document_sort(DocumentSortColumn::Name),
        KeyCode::Char('z') => app.toggle_document_sort(DocumentSortColumn::Size),
        KeyCode::Char('t') => app.toggle_document_sort(DocumentSortColumn::Uploaded),
        _ => {}
    }
}

fn handle_shares_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.open_share_info(),
        KeyCode::Char('x') | KeyCode::Delete => app.confirm_deactivate_share(),
        _ => {}
    }
}

fn handle_audit_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('a') => app.cycle_audit_action(),
        KeyCode::Char('r') => app.cycle_audit_resource(),
        KeyCode::Char('c') => app.reset_audit_filter(),
        KeyCode::Char('n') => app.next_audit_page(),
        KeyCode::Char('p') => app.previous_audit_page(),
        _ => {}
    }
}

// ===== Overlay input =====

fn handle_search_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.clear_search();
        }
        KeyCode::Enter => {
            // Keep the query active as a filter
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => {
            app.search_query.pop();
            app.document_selection = 0;
        }
        KeyCode::Char(c) => {
            push_bounded(&mut app.search_query, c, MAX_SEARCH_LENGTH);
            app.document_selection = 0;
        }
        _ => {}
    }
    Ok(false)
}

fn handle_upload_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Tab | KeyCode::Down => app.upload_focus = app.upload_focus.next(),
        KeyCode::BackTab | KeyCode::Up => app.upload_focus = app.upload_focus.prev(),
        KeyCode::Enter => match app.upload_focus {
            UploadFocus::Path => app.upload_focus = UploadFocus::Description,
            UploadFocus::Description | UploadFocus::Button => app.submit_upload(),
        },
        KeyCode::Backspace => {
            match app.upload_focus {
                UploadFocus::Path => app.upload_path.pop(),
                UploadFocus::Description => app.upload_description.pop(),
                UploadFocus::Button => None,
            };
        }
        KeyCode::Char(c) => match app.upload_focus {
            UploadFocus::Path => push_bounded(&mut app.upload_path, c, MAX_PATH_LENGTH),
            UploadFocus::Description => {
                push_bounded(&mut app.upload_description, c, MAX_DESCRIPTION_LENGTH)
            }
            UploadFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_share_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.pending_share = None;
            app.state = AppState::Normal;
        }
        KeyCode::Left | KeyCode::Char('h') => app.previous_share_expiry(),
        KeyCode::Right | KeyCode::Char('l') => app.next_share_expiry(),
        KeyCode::Enter => app.submit_share(),
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_bounded_respects_limit() {
        let mut field = String::from("abc");
        push_bounded(&mut field, 'd', 4);
        assert_eq!(field, "abcd");
        push_bounded(&mut field, 'e', 4);
        assert_eq!(field, "abcd");
    }

    #[test]
    fn test_push_bounded_rejects_control_chars() {
        let mut field = String::new();
        push_bounded(&mut field, '\u{1b}', 10);
        push_bounded(&mut field, '\n', 10);
        assert!(field.is_empty());
        push_bounded(&mut field, 'x', 10);
        assert_eq!(field, "x");
    }
}
