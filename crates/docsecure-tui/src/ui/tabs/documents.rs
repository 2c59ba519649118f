use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::app::{App, AppState, DocumentSortColumn};
use crate::ui::styles;
use crate::utils::{format_size, format_timestamp, truncate_string};

/// Render the Documents tab - sortable table plus a detail pane
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_document_table(frame, app, chunks[0]);
    render_document_detail(frame, app, chunks[1]);
}

fn render_document_table(frame: &mut Frame, app: &App, area: Rect) {
    let documents = app.get_sorted_documents();

    // Build header with sort indicators
    let sort_indicator = |column: DocumentSortColumn| {
        if app.document_sort_column == column {
            if app.document_sort_ascending {
                " ▲"
            } else {
                " ▼"
            }
        } else {
            ""
        }
    };

    let header_cells = [
        Cell::from(format!("Name{}", sort_indicator(DocumentSortColumn::Name))),
        Cell::from("Type"),
        Cell::from(format!("Size{}", sort_indicator(DocumentSortColumn::Size))),
        Cell::from(format!(
            "Uploaded{}",
            sort_indicator(DocumentSortColumn::Uploaded)
        )),
    ];

    let header = Row::new(header_cells)
        .style(styles::title_style())
        .height(1);

    let rows: Vec<Row> = documents
        .iter()
        .enumerate()
        .map(|(i, document)| {
            let style = if i == app.document_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };

            Row::new(vec![
                Cell::from(truncate_string(document.display_name(), 40)),
                Cell::from(document.kind().to_string()),
                Cell::from(format!("{:>9}", format_size(document.file_size))),
                Cell::from(format_timestamp(&document.created_at)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(42), // Name
        Constraint::Length(6),      // Type
        Constraint::Length(10),     // Size
        Constraint::Fill(1),        // Uploaded
    ];

    // The title doubles as the search indicator while a query is live
    let (title, title_style) = if app.state == AppState::Searching {
        (
            format!(" Documents ({}) - /{}▌ ", documents.len(), app.search_query),
            styles::search_style(),
        )
    } else if !app.search_query.is_empty() {
        (
            format!(" Documents ({}) - /{} ", documents.len(), app.search_query),
            styles::search_style(),
        )
    } else {
        (
            format!(" Documents ({}) - [n/z/t] sort ", documents.len()),
            styles::muted_style(),
        )
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(title_style)
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.document_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_document_detail(frame: &mut Frame, app: &App, area: Rect) {
    let content = match app.selected_document() {
        Some(document) => {
            let mut lines = vec![];

            lines.push(Line::from(Span::styled(
                document.display_name().to_string(),
                styles::title_style(),
            )));
            lines.push(Line::from(""));

            lines.push(Line::from(Span::styled("File", styles::highlight_style())));
            lines.push(Line::from(vec![
                Span::styled("Type:     ", styles::muted_style()),
                Span::raw(document.content_type.clone()),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Size:     ", styles::muted_style()),
                Span::raw(format_size(document.file_size)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Uploaded: ", styles::muted_style()),
                Span::raw(format_timestamp(&document.created_at)),
            ]));
            if let Some(ref updated_at) = document.updated_at {
                lines.push(Line::from(vec![
                    Span::styled("Updated:  ", styles::muted_style()),
                    Span::raw(format_timestamp(updated_at)),
                ]));
            }
            lines.push(Line::from(""));

            lines.push(Line::from(Span::styled(
                "Description",
                styles::highlight_style(),
            )));
            match document.description {
                Some(ref description) => lines.push(Line::from(description.clone())),
                None => lines.push(Line::from(Span::styled("-", styles::muted_style()))),
            }
            lines.push(Line::from(""));

            lines.push(Line::from(Span::styled(
                "Sharing",
                styles::highlight_style(),
            )));
            let active_links = app
                .shares
                .iter()
                .filter(|s| s.document_id == document.id && s.is_usable())
                .count();
            let sharing = match active_links {
                0 => "No active links - press [s] to share".to_string(),
                1 => "1 active share link".to_string(),
                n => format!("{} active share links", n),
            };
            lines.push(Line::from(sharing));

            lines
        }
        None => vec![
            Line::from(""),
            Line::from(Span::styled("  No documents", styles::muted_style())),
            Line::from(""),
            Line::from(Span::styled(
                "  Press [u] to upload one",
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
