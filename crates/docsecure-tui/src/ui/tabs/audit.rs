use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::styles;
use crate::utils::{format_timestamp, truncate_string};

/// Render the Audit tab - server-filtered event table plus a detail pane
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_audit_table(frame, app, chunks[0]);
    render_audit_detail(frame, app, chunks[1]);
}

fn render_audit_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new([
        Cell::from("Time"),
        Cell::from("Actor"),
        Cell::from("Action"),
        Cell::from("Resource"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = app
        .audit_logs
        .iter()
        .enumerate()
        .map(|(i, log)| {
            let style = if i == app.audit_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };

            Row::new(vec![
                Cell::from(format_timestamp(&log.timestamp)),
                Cell::from(truncate_string(log.actor_display(), 16)),
                Cell::from(log.action.clone()),
                Cell::from(log.resource_display()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(18),     // Time
        Constraint::Length(16),     // Actor
        Constraint::Length(10),     // Action
        Constraint::Fill(1),        // Resource
    ];

    // Active filters live in the title so narrowing is always visible
    let page = if app.audit_filter.skip > 0 {
        format!(" - page {}", app.audit_filter.skip / app.audit_filter.limit + 1)
    } else {
        String::new()
    };
    let title = format!(
        " Audit log ({}){} - action: {} | resource: {} ",
        app.audit_logs.len(),
        page,
        app.audit_filter.action.label(),
        app.audit_filter.resource.label(),
    );

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
    state.select(Some(app.audit_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_audit_detail(frame: &mut Frame, app: &App, area: Rect) {
    let content = match app.selected_audit_log() {
        Some(log) => {
            let mut lines = vec![];

            lines.push(Line::from(Span::styled(
                format!("{} {}", log.action, log.resource_display()),
                styles::title_style(),
            )));
            lines.push(Line::from(""));

            lines.push(Line::from(vec![
                Span::styled("Time:   ", styles::muted_style()),
                Span::raw(format_timestamp(&log.timestamp)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Actor:  ", styles::muted_style()),
                Span::raw(log.actor_display().to_string()),
            ]));
            let ip = log.ip_address.as_deref().unwrap_or("-").to_string();
            lines.push(Line::from(vec![
                Span::styled("From:   ", styles::muted_style()),
                Span::raw(ip),
            ]));
            lines.push(Line::from(""));

            lines.push(Line::from(Span::styled(
                "Details",
                styles::highlight_style(),
            )));
            match log.details {
                Some(ref details) => lines.push(Line::from(details.clone())),
                None => lines.push(Line::from(Span::styled("-", styles::muted_style()))),
            }

            lines
        }
        None => vec![
            Line::from(""),
            Line::from(Span::styled("  No audit entries", styles::muted_style())),
            Line::from(""),
            Line::from(Span::styled(
                "  Try [c] to clear the filters",
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
