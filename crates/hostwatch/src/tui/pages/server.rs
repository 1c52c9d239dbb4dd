//! Server diagnostics page: the backend's text report for one host.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::widgets::{Block, Paragraph};

use super::host_selector;
use crate::tui::state::AppState;
use crate::tui::style::Styles;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let [top, body] = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);
    frame.render_widget(
        Paragraph::new(host_selector(&state.hosts, state.selected_host())),
        top,
    );

    let server = &state.server;
    let Some(host) = state.selected_host() else {
        frame.render_widget(
            Paragraph::new("missing host: no host selected").style(Styles::error()),
            body,
        );
        return;
    };

    let block = Block::bordered();
    let paragraph = if server.pending.as_deref() == Some(host) {
        Paragraph::new(format!("loading {}...", host)).style(Styles::dim())
    } else {
        match &server.loaded {
            Some((loaded, Ok(text))) if loaded == host => Paragraph::new(text.as_str())
                .style(Styles::default())
                .scroll((server.scroll, 0)),
            Some((loaded, Err(e))) if loaded == host => {
                Paragraph::new(format!("failed to load: {}", e)).style(Styles::error())
            }
            _ => Paragraph::new("press Enter to load this host").style(Styles::dim()),
        }
    };
    frame.render_widget(paragraph.block(block), body);
}
