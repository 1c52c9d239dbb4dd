//! Main TUI application.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use tokio::runtime::Handle;

use hostwatch_core::drag::{Bounds, DragMsg};
use hostwatch_core::fmt::now_epoch;
use hostwatch_core::order::{FileOrderStore, OrderStore};
use hostwatch_core::poll::{Poller, RefreshCycle, RenderKind};
use hostwatch_core::source::{MetricsSource, Request, Update};
use hostwatch_core::view::ViewError;

use super::event::{Event, EventHandler};
use super::input::{KeyAction, handle_key};
use super::render::render;
use super::state::{AppState, HistoryData, HistoryQuery, Page};

/// Startup options.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub interval_secs: f64,
    pub page: Page,
    pub host: Option<String>,
    pub state_file: PathBuf,
}

/// Errors that end the application.
#[derive(Debug)]
pub enum AppError {
    /// Terminal setup, drawing or teardown failed.
    Io(io::Error),
    /// An engine lost track of a view element.
    View(ViewError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(e) => write!(f, "terminal error: {}", e),
            AppError::View(e) => write!(f, "view error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(e) => Some(e),
            AppError::View(e) => Some(e),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<ViewError> for AppError {
    fn from(e: ViewError) -> Self {
        AppError::View(e)
    }
}

/// Main TUI application.
pub struct App<S: MetricsSource> {
    source: Arc<S>,
    runtime: Handle,
    poller: Option<Poller<S, Event>>,
    state: AppState,
    store: FileOrderStore,
    cycles: HashMap<Page, RefreshCycle>,
    should_quit: bool,
}

impl<S: MetricsSource> App<S> {
    /// Creates a new App fetching from `source` on `runtime`.
    pub fn new(source: Arc<S>, runtime: Handle, config: AppConfig) -> Result<Self, AppError> {
        let store = FileOrderStore::new(config.state_file);
        let mut state = AppState::new(config.page, config.host)?;
        match store.load() {
            Ok(order) => state.set_stored_order(order),
            Err(e) => {
                tracing::warn!(path = %store.path().display(), error = %e, "ignoring saved card order");
            }
        }
        let cycles = Page::all()
            .iter()
            .filter(|p| p.is_periodic())
            .map(|p| (*p, RefreshCycle::new(config.interval_secs)))
            .collect();
        Ok(Self {
            source,
            runtime,
            poller: None,
            state,
            store,
            cycles,
            should_quit: false,
        })
    }

    /// Runs the TUI application.
    pub fn run(mut self, tick_rate: Duration) -> Result<(), AppError> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let events = EventHandler::new(tick_rate);
        self.poller = Some(Poller::new(
            Arc::clone(&self.source),
            events.sender(),
            self.runtime.clone(),
        ));

        let result = self.event_loop(&mut terminal, &events);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &EventHandler,
    ) -> Result<(), AppError> {
        // Initial fetch: host list for the host pages, then the page itself
        self.request(Request::Hosts);
        self.open_page();

        loop {
            terminal.draw(|frame| render(frame, &mut self.state))?;

            match events.next() {
                Ok(Event::Tick) => self.on_tick()?,
                Ok(Event::Key(key)) => {
                    let editing = self.state.dashboard.drag.is_editing();
                    match handle_key(&mut self.state, key, editing) {
                        KeyAction::Quit => self.should_quit = true,
                        KeyAction::Refresh => self.refresh(),
                        KeyAction::PageChanged => {
                            if self.state.page != Page::Dashboard {
                                self.leave_edit_mode()?;
                            }
                            self.open_page();
                        }
                        KeyAction::ToggleEdit => self.toggle_edit_mode()?,
                        KeyAction::HostChanged | KeyAction::Fetch => self.fetch_selected(),
                        KeyAction::None => {}
                    }
                }
                Ok(Event::Mouse(mouse)) => self.on_mouse(mouse)?,
                // the next draw picks up the new size
                Ok(Event::Resize(..)) => {}
                Ok(Event::Fetched(update)) => self.on_update(update)?,
                Err(_) => self.should_quit = true,
            }

            if self.should_quit {
                break;
            }
        }

        // a drag cut short by quitting still lands and is saved
        self.leave_edit_mode()?;
        Ok(())
    }

    fn request(&self, request: Request) {
        if let Some(poller) = &self.poller {
            poller.request(request);
        }
    }

    /// Fetch whatever the current page shows.
    fn page_request(&mut self) -> Option<Request> {
        match self.state.page {
            Page::Dashboard => Some(Request::Dashboard),
            Page::Disk => Some(Request::Disk),
            Page::Users => Some(Request::Summary),
            Page::History => {
                let host = self.state.selected_host()?.to_string();
                let query = self.state.history.begin(&host);
                Some(Request::History {
                    host: query.host,
                    start: query.start,
                    end: query.end,
                })
            }
            Page::Server => {
                let host = self.state.selected_host()?.to_string();
                self.state.server.pending = Some(host.clone());
                Some(Request::ServerInfo { host })
            }
        }
    }

    /// Fetch the current page now and restart its interval.
    fn refresh(&mut self) {
        let now = now_epoch();
        if let Some(cycle) = self.cycles.get_mut(&self.state.page) {
            cycle.started(now);
        }
        match self.page_request() {
            Some(request) => self.request(request),
            None if self.state.page.uses_host() => {
                // no host known yet; the host list answer triggers the fetch
                self.request(Request::Hosts);
            }
            None => {}
        }
    }

    fn open_page(&mut self) {
        let page = self.state.page;
        let loaded = match page {
            Page::History => self.state.history.loaded.is_some(),
            Page::Server => self.state.server.loaded.is_some(),
            _ => false,
        };
        if page.is_periodic() || !loaded {
            self.refresh();
        }
    }

    /// Per-host pages refetch when the selection moves.
    fn fetch_selected(&mut self) {
        if self.state.page.uses_host() {
            self.refresh();
        }
    }

    fn on_tick(&mut self) -> Result<(), AppError> {
        let now = now_epoch();
        let page = self.state.page;
        if self.cycles.get(&page).is_some_and(|c| c.is_due(now)) {
            self.refresh();
        }

        let dash = &mut self.state.dashboard;
        if dash.cards.next_due().is_some_and(|due| due <= now) {
            dash.cards.tick(&mut dash.view, now)?;
        }
        self.state.disk.panels.tick(now);
        self.state.users.panels.tick(now);
        Ok(())
    }

    fn succeeded(&mut self, page: Page) -> RenderKind {
        self.cycles
            .get_mut(&page)
            .map(RefreshCycle::succeeded)
            .unwrap_or(RenderKind::Incremental)
    }

    fn on_update(&mut self, update: Update) -> Result<(), AppError> {
        let now = now_epoch();
        match update {
            Update::Dashboard(Ok(records)) => {
                let kind = self.succeeded(Page::Dashboard);
                let full = kind == RenderKind::Full;
                self.state
                    .dashboard
                    .apply(&records, now, full, &self.state.stored_order)?;
                tracing::debug!(hosts = records.len(), ?kind, "dashboard rendered");
                self.clear_status("dashboard");
            }
            Update::Dashboard(Err(e)) => {
                self.state.status_message = Some(format!("dashboard: {}", e));
            }
            Update::Hosts(Ok(hosts)) => {
                let first = self.state.selected_host().is_none();
                self.state.set_hosts(hosts);
                let page = self.state.page;
                let loaded = match page {
                    Page::History => self.state.history.loaded.is_some(),
                    Page::Server => self.state.server.loaded.is_some(),
                    _ => true,
                };
                if first && page.uses_host() && !loaded {
                    self.refresh();
                }
            }
            Update::Hosts(Err(e)) => {
                self.state.status_message = Some(format!("hosts: {}", e));
            }
            Update::Disk { host, result } => {
                let stamp = result
                    .as_ref()
                    .ok()
                    .and_then(|disks| disks.iter().filter_map(|d| d.time).reduce(f64::max));
                if result.is_ok() {
                    self.succeeded(Page::Disk);
                }
                self.state
                    .disk
                    .panels
                    .set(&host, result.map_err(|e| e.to_string()), stamp, now);
            }
            Update::Summary { host, result } => {
                let stamp = result
                    .as_ref()
                    .ok()
                    .and_then(|records| records.first().map(|r| r.timestamp));
                if result.is_ok() {
                    self.succeeded(Page::Users);
                }
                self.state
                    .users
                    .panels
                    .set(&host, result.map_err(|e| e.to_string()), stamp, now);
            }
            Update::History {
                host,
                start,
                end,
                result,
            } => {
                let query = HistoryQuery { host, start, end };
                let loaded = result.map(HistoryData::new).map_err(|e| e.to_string());
                if !self.state.history.accept(query, loaded) {
                    tracing::debug!(start, end, "dropping superseded history answer");
                }
            }
            Update::ServerInfo { host, result } => {
                let result = result.map_err(|e| e.to_string());
                if !self.state.server.accept(host.clone(), result) {
                    tracing::debug!(host = %host, "dropping superseded server info");
                }
            }
        }
        Ok(())
    }

    fn clear_status(&mut self, prefix: &str) {
        if self
            .state
            .status_message
            .as_deref()
            .is_some_and(|m| m.starts_with(prefix))
        {
            self.state.status_message = None;
        }
    }

    // ============================================================
    // Edit mode
    // ============================================================

    fn toggle_edit_mode(&mut self) -> Result<(), AppError> {
        if self.state.dashboard.drag.is_editing() {
            self.leave_edit_mode()
        } else {
            let dash = &mut self.state.dashboard;
            dash.drag.enter(&mut dash.view)?;
            Ok(())
        }
    }

    fn leave_edit_mode(&mut self) -> Result<(), AppError> {
        let dash = &mut self.state.dashboard;
        if let Some(order) = dash.drag.exit(&mut dash.view, &mut self.store)? {
            self.state.set_stored_order(order);
        }
        Ok(())
    }

    fn on_mouse(&mut self, mouse: MouseEvent) -> Result<(), AppError> {
        match self.state.page {
            Page::Disk => {
                self.state.disk.hover = Some((mouse.column, mouse.row));
                return Ok(());
            }
            Page::Dashboard => {}
            _ => return Ok(()),
        }

        let dash = &mut self.state.dashboard;
        if !dash.drag.is_editing() {
            return Ok(());
        }
        let msg = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => dash
                .card_at(mouse.column, mouse.row)
                .map(|(id, _)| DragMsg::Start(id.to_string())),
            MouseEventKind::Drag(MouseButton::Left) => {
                dash.card_at(mouse.column, mouse.row)
                    .map(|(id, rect)| DragMsg::Over {
                        pointer_x: f64::from(mouse.column),
                        candidate: id.to_string(),
                        bounds: Bounds {
                            left: f64::from(rect.x),
                            width: f64::from(rect.width),
                        },
                    })
            }
            MouseEventKind::Up(MouseButton::Left) => Some(DragMsg::End),
            _ => None,
        };
        if let Some(msg) = msg {
            dash.drag.handle(&mut dash.view, msg)?;
        }
        Ok(())
    }
}
