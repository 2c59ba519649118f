use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use docsecure_core::models::ShareLink;

use crate::app::App;
use crate::ui::styles;
use crate::utils::{format_date, format_timestamp, truncate_string};

/// Status column text and color for a share link
fn status_label(share: &ShareLink) -> (&'static str, Style) {
    if !share.is_active {
        ("revoked", styles::inactive_style())
    } else if share.is_expired() {
        ("expired", styles::error_style())
    } else {
        ("active", styles::success_style())
    }
}

/// Render the Shares tab - link table plus a detail pane
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_share_table(frame, app, chunks[0]);
    render_share_detail(frame, app, chunks[1]);
}

fn render_share_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new([
        Cell::from("Document"),
        Cell::from("Status"),
        Cell::from("Created"),
        Cell::from("Expires"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = app
        .shares
        .iter()
        .enumerate()
        .map(|(i, share)| {
            let (status, status_style) = status_label(share);
            let row_style = if i == app.share_selection {
                styles::selected_style()
            } else if !share.is_active {
                styles::inactive_style()
            } else {
                styles::list_item_style()
            };

            let document = app
                .document_name(share.document_id)
                .map(|name| truncate_string(name, 36))
                .unwrap_or_else(|| format!("document #{}", share.document_id));
            let expires = share
                .expires_at
                .as_ref()
                .map(format_date)
                .unwrap_or_else(|| "never".to_string());

            Row::new(vec![
                Cell::from(document),
                Cell::from(Span::styled(status, status_style)),
                Cell::from(format_date(&share.created_at)),
                Cell::from(expires),
            ])
            .style(row_style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(44), // Document
        Constraint::Length(8),      // Status
        Constraint::Fill(1),        // Created
        Constraint::Fill(1),        // Expires
    ];

    let title = format!(" Share links ({}) ", app.shares.len());

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.share_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_share_detail(frame: &mut Frame, app: &App, area: Rect) {
    let content = match app.selected_share() {
        Some(share) => {
            let (status, status_style) = status_label(share);
            let document = app
                .document_name(share.document_id)
                .unwrap_or("(deleted document)")
                .to_string();

            let mut lines = vec![];
            lines.push(Line::from(Span::styled(document, styles::title_style())));
            lines.push(Line::from(""));

            lines.push(Line::from(Span::styled("Link", styles::highlight_style())));
            lines.push(Line::from(share.public_url(&app.config.share_base_url)));
            lines.push(Line::from(""));

            lines.push(Line::from(vec![
                Span::styled("Status:   ", styles::muted_style()),
                Span::styled(status, status_style),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Created:  ", styles::muted_style()),
                Span::raw(format_timestamp(&share.created_at)),
            ]));
            let expires = share
                .expires_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "never".to_string());
            lines.push(Line::from(vec![
                Span::styled("Expires:  ", styles::muted_style()),
                Span::raw(expires),
            ]));
            lines.push(Line::from(""));

            if share.is_usable() {
                lines.push(Line::from(Span::styled(
                    "Anyone with this link can view and",
                    styles::muted_style(),
                )));
                lines.push(Line::from(Span::styled(
                    "download the document until it expires.",
                    styles::muted_style(),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    "This link no longer works for recipients.",
                    styles::muted_style(),
                )));
            }

            lines
        }
        None => vec![
            Line::from(""),
            Line::from(Span::styled("  No share links", styles::muted_style())),
            Line::from(""),
            Line::from(Span::styled(
                "  Press [s] on a document to create one",
                styles::muted_style(),
            )),
        ],
    };

    let paragraph = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Detail ")
            .title_style(styles::muted_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(false)),
    );
    frame.render_widget(paragraph, area);
}
