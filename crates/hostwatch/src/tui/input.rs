//! Input handling and keybindings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::state::{AppState, Page, PopupState};

/// Result of handling a key event.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// No action, continue.
    None,
    /// Quit the application.
    Quit,
    /// Refetch the current page now.
    Refresh,
    /// Page switched; the app decides what to fetch.
    PageChanged,
    /// Enter or leave dashboard edit mode.
    ToggleEdit,
    /// Selected host changed on a per-host page.
    HostChanged,
    /// Fetch the current page for the selected host (`Enter`).
    Fetch,
}

/// Handles key input and updates state.
pub fn handle_key(state: &mut AppState, key: KeyEvent, editing: bool) -> KeyAction {
    if matches!(state.popup, PopupState::QuitConfirm) {
        return handle_quit_confirm(state, key);
    }
    handle_normal_mode(state, key, editing)
}

fn handle_quit_confirm(state: &mut AppState, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('Q') => {
            state.popup = PopupState::None;
            KeyAction::Quit
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.popup = PopupState::None;
            KeyAction::Quit
        }
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
            state.popup = PopupState::None;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

fn switch(state: &mut AppState, page: Page) -> KeyAction {
    if state.page == page {
        return KeyAction::None;
    }
    state.switch_page(page);
    KeyAction::PageChanged
}

/// Handles keys in normal mode.
fn handle_normal_mode(state: &mut AppState, key: KeyEvent, editing: bool) -> KeyAction {
    match key.code {
        // Quit
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            state.popup = PopupState::QuitConfirm;
            KeyAction::None
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,

        // Page navigation
        KeyCode::Tab => {
            let page = state.page.next();
            switch(state, page)
        }
        KeyCode::BackTab => {
            let page = state.page.prev();
            switch(state, page)
        }
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            switch(state, Page::all()[index])
        }

        KeyCode::Char('r') => KeyAction::Refresh,

        // Dashboard
        KeyCode::Char('e') if state.page == Page::Dashboard => KeyAction::ToggleEdit,
        KeyCode::Esc if state.page == Page::Dashboard && editing => KeyAction::ToggleEdit,

        // Disk
        KeyCode::Char('c') if state.page == Page::Disk => {
            state.disk.colour = state.disk.colour.toggle();
            state.status_message = Some(state.disk.colour.to_string());
            KeyAction::None
        }
        KeyCode::Char('n') if state.page == Page::Disk => {
            state.disk.norm = state.disk.norm.cycle();
            state.status_message = Some(state.disk.norm.to_string());
            KeyAction::None
        }

        // Users
        KeyCode::Char('s') if state.page == Page::Users => {
            state.users.sort = state.users.sort.cycle();
            state.status_message = Some(format!("sorted {}", state.users.sort));
            KeyAction::None
        }

        // Host selection
        KeyCode::Left if state.page.uses_host() => host_step(state, -1),
        KeyCode::Right if state.page.uses_host() => host_step(state, 1),
        KeyCode::Enter if state.page.uses_host() => KeyAction::Fetch,

        // History window
        KeyCode::Char('-') if state.page == Page::History => {
            state.history.range.shift_start(-1);
            KeyAction::None
        }
        KeyCode::Char('+') | KeyCode::Char('=') if state.page == Page::History => {
            state.history.range.shift_start(1);
            KeyAction::None
        }
        KeyCode::Char('[') if state.page == Page::History => {
            state.history.range.shift_end(-1);
            KeyAction::None
        }
        KeyCode::Char(']') if state.page == Page::History => {
            state.history.range.shift_end(1);
            KeyAction::None
        }

        // Scrolling
        KeyCode::Up | KeyCode::Char('k') => scroll(state, |s| s.saturating_sub(1)),
        KeyCode::Down | KeyCode::Char('j') => scroll(state, |s| s.saturating_add(1)),
        KeyCode::Home => scroll(state, |_| 0),

        _ => KeyAction::None,
    }
}

fn host_step(state: &mut AppState, step: isize) -> KeyAction {
    if state.select_host(step) {
        KeyAction::HostChanged
    } else {
        KeyAction::None
    }
}

fn scroll(state: &mut AppState, f: impl FnOnce(u16) -> u16) -> KeyAction {
    let offset = match state.page {
        Page::Dashboard => &mut state.dashboard.scroll,
        Page::Disk => &mut state.disk.scroll,
        Page::Users => &mut state.users.scroll,
        Page::Server => &mut state.server.scroll,
        Page::History => return KeyAction::None,
    };
    *offset = f(*offset);
    KeyAction::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostwatch_core::charts::{ColorMode, NormMode, SummarySort};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_quit_requires_confirmation() {
        let mut state = AppState::new(Page::Dashboard, None).unwrap();
        assert_eq!(handle_key(&mut state, key(KeyCode::Char('q')), false), KeyAction::None);
        assert_eq!(state.popup, PopupState::QuitConfirm);

        assert_eq!(handle_key(&mut state, key(KeyCode::Esc), false), KeyAction::None);
        assert_eq!(state.popup, PopupState::None);

        handle_key(&mut state, key(KeyCode::Char('q')), false);
        assert_eq!(handle_key(&mut state, key(KeyCode::Enter), false), KeyAction::Quit);

        assert_eq!(handle_key(&mut state, ctrl('c'), false), KeyAction::Quit);
    }

    #[test]
    fn test_page_switching() {
        let mut state = AppState::new(Page::Dashboard, None).unwrap();
        assert_eq!(handle_key(&mut state, key(KeyCode::Char('3')), false), KeyAction::PageChanged);
        assert_eq!(state.page, Page::History);
        assert_eq!(handle_key(&mut state, key(KeyCode::Char('3')), false), KeyAction::None);
        assert_eq!(handle_key(&mut state, key(KeyCode::Tab), false), KeyAction::PageChanged);
        assert_eq!(state.page, Page::Users);
        assert_eq!(handle_key(&mut state, key(KeyCode::BackTab), false), KeyAction::PageChanged);
        assert_eq!(state.page, Page::History);
    }

    #[test]
    fn test_page_specific_keys() {
        let mut state = AppState::new(Page::Dashboard, None).unwrap();
        assert_eq!(handle_key(&mut state, key(KeyCode::Char('e')), false), KeyAction::ToggleEdit);
        assert_eq!(handle_key(&mut state, key(KeyCode::Esc), true), KeyAction::ToggleEdit);
        assert_eq!(handle_key(&mut state, key(KeyCode::Esc), false), KeyAction::None);

        state.switch_page(Page::Disk);
        assert_eq!(handle_key(&mut state, key(KeyCode::Char('e')), false), KeyAction::None);
        handle_key(&mut state, key(KeyCode::Char('c')), false);
        handle_key(&mut state, key(KeyCode::Char('n')), false);
        assert_eq!(state.disk.colour, ColorMode::ByFleetMean);
        assert_eq!(state.disk.norm, NormMode::ByFleetMax);

        state.switch_page(Page::Users);
        handle_key(&mut state, key(KeyCode::Char('s')), false);
        assert_eq!(state.users.sort, SummarySort::Cpu);
    }

    #[test]
    fn test_history_keys() {
        let mut state = AppState::new(Page::History, None).unwrap();
        state.set_hosts(vec!["a".to_string(), "b".to_string()]);
        let before = state.history.range;

        handle_key(&mut state, key(KeyCode::Char('-')), false);
        handle_key(&mut state, key(KeyCode::Char(']')), false);
        assert_eq!(state.history.range.start, before.start - chrono::Duration::days(1));
        assert_eq!(state.history.range.end, before.end + chrono::Duration::days(1));

        assert_eq!(handle_key(&mut state, key(KeyCode::Right), false), KeyAction::HostChanged);
        assert_eq!(state.selected_host(), Some("b"));
        assert_eq!(handle_key(&mut state, key(KeyCode::Enter), false), KeyAction::Fetch);
    }
}
