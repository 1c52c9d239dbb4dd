//! Header bar: clock, pages, edit mode and status.

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::state::{AppState, Page};
use crate::tui::style::Styles;

/// Renders the header bar.
pub fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::horizontal([
        Constraint::Length(21), // Time
        Constraint::Min(20),    // Pages
        Constraint::Length(8),  // Mode
        Constraint::Length(44), // Status
    ])
    .split(area);

    let time = Paragraph::new(Local::now().format(" %Y-%m-%d %H:%M:%S").to_string())
        .style(Styles::header());
    frame.render_widget(time, chunks[0]);

    let pages: Vec<Span> = Page::all()
        .iter()
        .enumerate()
        .flat_map(|(i, page)| {
            let style = if *page == state.page {
                Styles::tab_active()
            } else {
                Styles::tab_inactive()
            };
            vec![
                Span::styled(format!(" {}:", i + 1), Styles::tab_inactive()),
                Span::styled(format!("{} ", page.name()), style),
            ]
        })
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(pages)).style(Styles::header()),
        chunks[1],
    );

    let (mode, mode_style) = if state.dashboard.drag.is_editing() {
        (" EDIT ", Styles::edit())
    } else {
        ("", Styles::header())
    };
    frame.render_widget(Paragraph::new(mode).style(mode_style), chunks[2]);

    let status = state.status_message.clone().unwrap_or_default();
    frame.render_widget(Paragraph::new(status).style(Styles::header()), chunks[3]);
}
