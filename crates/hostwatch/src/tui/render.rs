//! Top-level frame layout.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use super::pages;
use super::state::{AppState, Page, PopupState};
use super::widgets::{render_cards, render_footer, render_header, render_quit_confirm};

/// Draws one frame: header, the current page, key hints and any popup.
pub fn render(frame: &mut Frame, state: &mut AppState) {
    let [header, content, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header, state);

    match state.page {
        Page::Dashboard => render_cards(frame, content, &mut state.dashboard),
        Page::Disk => pages::disk::render(frame, content, &state.hosts, &state.disk),
        Page::History => pages::history::render(frame, content, state),
        Page::Users => pages::users::render(frame, content, &state.hosts, &state.users),
        Page::Server => pages::server::render(frame, content, state),
    }

    render_footer(frame, footer, state.page, state.dashboard.drag.is_editing());

    if state.popup == PopupState::QuitConfirm {
        render_quit_confirm(frame, frame.area());
    }
}
