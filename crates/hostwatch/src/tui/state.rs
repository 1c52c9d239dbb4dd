//! Application state management.

use std::collections::HashMap;

use ratatui::layout::Rect;

use hostwatch_core::cards::{card_id, CardEngine};
use hostwatch_core::charts::{
    user_gpu_stats, ColorMode, DateRange, HistorySeries, NormMode, SummarySort, UserGpuStat,
};
use hostwatch_core::drag::DragReorder;
use hostwatch_core::fmt::time_ago_at;
use hostwatch_core::model::{DiskRecord, SnapshotRecord, UserSummaryRecord};
use hostwatch_core::order::restore_order;
use hostwatch_core::timers::TimerSet;
use hostwatch_core::view::{NodeKind, ViewError, ViewHandle, ViewTree, ROOT};

/// Node id of the dashboard card container.
pub const CARD_CONTAINER: &str = "cards";

/// Available pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Page {
    #[default]
    Dashboard,
    Disk,
    History,
    Users,
    Server,
}

impl Page {
    pub fn all() -> &'static [Page] {
        &[
            Page::Dashboard,
            Page::Disk,
            Page::History,
            Page::Users,
            Page::Server,
        ]
    }

    /// Returns the display name of the page.
    pub fn name(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Disk => "Disk",
            Page::History => "History",
            Page::Users => "Users",
            Page::Server => "Server",
        }
    }

    pub fn next(&self) -> Page {
        match self {
            Page::Dashboard => Page::Disk,
            Page::Disk => Page::History,
            Page::History => Page::Users,
            Page::Users => Page::Server,
            Page::Server => Page::Dashboard,
        }
    }

    pub fn prev(&self) -> Page {
        match self {
            Page::Dashboard => Page::Server,
            Page::Disk => Page::Dashboard,
            Page::History => Page::Disk,
            Page::Users => Page::History,
            Page::Server => Page::Users,
        }
    }

    /// Pages refetched every interval; the others load on demand.
    pub fn is_periodic(&self) -> bool {
        matches!(self, Page::Dashboard | Page::Disk | Page::Users)
    }

    /// Pages that work on the single selected host.
    pub fn uses_host(&self) -> bool {
        matches!(self, Page::History | Page::Server)
    }
}

/// Active popup state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PopupState {
    #[default]
    None,
    QuitConfirm,
}

/// Result of a fetch as kept for display.
pub type Loaded<T> = Result<T, String>;

// ============================================================
// Per-host panels (disk and user summary pages)
// ============================================================

/// Latest result per host plus its self-refreshing "time ago" text.
#[derive(Debug)]
pub struct HostPanels<T> {
    data: HashMap<String, Loaded<T>>,
    stamps: HashMap<String, f64>,
    ago: HashMap<String, String>,
    timers: TimerSet<String>,
}

impl<T> Default for HostPanels<T> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
            stamps: HashMap::new(),
            ago: HashMap::new(),
            timers: TimerSet::new(),
        }
    }
}

impl<T> HostPanels<T> {
    /// Store a host's result. A successful result with a measurement time
    /// re-arms the host's timer; a failure keeps the last timestamp.
    pub fn set(&mut self, host: &str, result: Loaded<T>, stamp: Option<f64>, now: f64) {
        if result.is_ok() {
            match stamp {
                Some(ts) => {
                    self.stamps.insert(host.to_string(), ts);
                    self.ago.insert(host.to_string(), time_ago_at(ts, now));
                    self.timers.arm(host.to_string(), now);
                }
                None => {
                    self.stamps.remove(host);
                    self.ago.remove(host);
                    self.timers.cancel(&host.to_string());
                }
            }
        }
        self.data.insert(host.to_string(), result);
    }

    pub fn get(&self, host: &str) -> Option<&Loaded<T>> {
        self.data.get(host)
    }

    pub fn stamp(&self, host: &str) -> Option<f64> {
        self.stamps.get(host).copied()
    }

    pub fn ago(&self, host: &str) -> Option<&str> {
        self.ago.get(host).map(String::as_str)
    }

    /// Refresh the text of every due timer. Returns how many fired.
    pub fn tick(&mut self, now: f64) -> usize {
        let fired = self.timers.fire_due(now);
        for host in &fired {
            if let Some(ts) = self.stamps.get(host) {
                self.ago.insert(host.clone(), time_ago_at(*ts, now));
            }
        }
        fired.len()
    }
}

// ============================================================
// Page states
// ============================================================

/// Dashboard: the view tree plus the engines that own it.
#[derive(Debug)]
pub struct DashboardState {
    pub view: ViewTree,
    pub cards: CardEngine,
    pub drag: DragReorder,
    /// First card row shown.
    pub scroll: u16,
    /// Screen area of every visible card, filled by the renderer.
    pub card_rects: Vec<(String, Rect)>,
}

impl DashboardState {
    pub fn new() -> Result<Self, ViewError> {
        let mut view = ViewTree::new();
        view.create(ROOT, CARD_CONTAINER, NodeKind::Container)?;
        Ok(Self {
            view,
            cards: CardEngine::new(CARD_CONTAINER),
            drag: DragReorder::new(CARD_CONTAINER),
            scroll: 0,
            card_rects: Vec::new(),
        })
    }

    /// Reconcile a dashboard fetch. Outside edit mode the stored order is
    /// applied on a full render and whenever a new card shows up, so late
    /// hosts still take their saved place.
    pub fn apply(
        &mut self,
        records: &[SnapshotRecord],
        now: f64,
        full: bool,
        stored: &[String],
    ) -> Result<usize, ViewError> {
        let created = self.cards.apply_all(&mut self.view, records, now)?;
        if (full || created > 0) && !self.drag.is_editing() {
            self.drag.restore(&mut self.view, stored)?;
        }
        Ok(created)
    }

    /// Card under the given terminal cell.
    pub fn card_at(&self, column: u16, row: u16) -> Option<(&str, Rect)> {
        self.card_rects
            .iter()
            .find(|(_, r)| {
                column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
            })
            .map(|(id, r)| (id.as_str(), *r))
    }
}

#[derive(Debug, Default)]
pub struct DiskPageState {
    pub panels: HostPanels<Vec<DiskRecord>>,
    pub colour: ColorMode,
    pub norm: NormMode,
    pub scroll: u16,
    /// Last pointer position, for slice tooltips.
    pub hover: Option<(u16, u16)>,
}

#[derive(Debug, Default)]
pub struct UsersPageState {
    pub panels: HostPanels<Vec<UserSummaryRecord>>,
    pub sort: SummarySort,
    pub scroll: u16,
}

/// Everything the history page draws for one host and window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryData {
    pub series: HistorySeries,
    pub users: Vec<UserGpuStat>,
}

impl HistoryData {
    pub fn new(records: Vec<SnapshotRecord>) -> Self {
        let users = user_gpu_stats(&records);
        Self {
            series: HistorySeries::build(records),
            users,
        }
    }
}

/// Host and epoch window of one history fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub host: String,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug)]
pub struct HistoryPageState {
    pub range: DateRange,
    /// Fetch in flight; only its answer is shown.
    pub pending: Option<HistoryQuery>,
    pub loaded: Option<(HistoryQuery, Loaded<HistoryData>)>,
}

impl Default for HistoryPageState {
    fn default() -> Self {
        Self {
            range: DateRange::last_week(),
            pending: None,
            loaded: None,
        }
    }
}

impl HistoryPageState {
    /// Query for `host` over the current date range, marked as in flight.
    pub fn begin(&mut self, host: &str) -> HistoryQuery {
        let (start, end) = self.range.window();
        let query = HistoryQuery {
            host: host.to_string(),
            start,
            end,
        };
        self.pending = Some(query.clone());
        query
    }

    /// Keep an answer if it is for the fetch in flight. Superseded answers
    /// are dropped.
    pub fn accept(&mut self, query: HistoryQuery, result: Loaded<HistoryData>) -> bool {
        if self.pending.as_ref() != Some(&query) {
            return false;
        }
        self.pending = None;
        self.loaded = Some((query, result));
        true
    }

    pub fn is_pending(&self, host: &str) -> bool {
        self.pending.as_ref().is_some_and(|q| q.host == host)
    }

    /// Result loaded for `host`, with whether it covers the current range.
    pub fn loaded_for(&self, host: &str) -> Option<(&Loaded<HistoryData>, bool)> {
        let (query, result) = self.loaded.as_ref().filter(|(q, _)| q.host == host)?;
        let current = (query.start, query.end) == self.range.window();
        Some((result, current))
    }
}

#[derive(Debug, Default)]
pub struct ServerPageState {
    pub pending: Option<String>,
    pub loaded: Option<(String, Loaded<String>)>,
    pub scroll: u16,
}

impl ServerPageState {
    /// Keep an answer if it is for the host in flight.
    pub fn accept(&mut self, host: String, result: Loaded<String>) -> bool {
        if self.pending.as_deref() != Some(host.as_str()) {
            return false;
        }
        self.pending = None;
        self.scroll = 0;
        self.loaded = Some((host, result));
        true
    }
}

// ============================================================
// App state
// ============================================================

/// Order hosts the way their cards were arranged: stored card order first,
/// then the rest in the order given.
pub fn ordered_hosts(hosts: &[String], stored: &[String]) -> Vec<String> {
    let by_card: HashMap<String, &String> = hosts.iter().map(|h| (card_id(h), h)).collect();
    let cards: Vec<String> = hosts.iter().map(|h| card_id(h)).collect();
    restore_order(&cards, stored)
        .iter()
        .filter_map(|id| by_card.get(id).map(|h| (*h).clone()))
        .collect()
}

#[derive(Debug)]
pub struct AppState {
    pub page: Page,
    pub popup: PopupState,
    /// One-line message in the header (last error, hints).
    pub status_message: Option<String>,
    /// Known hosts in display order.
    pub hosts: Vec<String>,
    selected: Option<String>,
    /// Card order as last loaded or saved.
    pub stored_order: Vec<String>,
    pub dashboard: DashboardState,
    pub disk: DiskPageState,
    pub users: UsersPageState,
    pub history: HistoryPageState,
    pub server: ServerPageState,
}

impl AppState {
    pub fn new(page: Page, host: Option<String>) -> Result<Self, ViewError> {
        Ok(Self {
            page,
            popup: PopupState::None,
            status_message: None,
            hosts: Vec::new(),
            selected: host,
            stored_order: Vec::new(),
            dashboard: DashboardState::new()?,
            disk: DiskPageState::default(),
            users: UsersPageState::default(),
            history: HistoryPageState::default(),
            server: ServerPageState::default(),
        })
    }

    pub fn switch_page(&mut self, page: Page) {
        if self.page != page {
            self.page = page;
            self.status_message = None;
        }
    }

    pub fn selected_host(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Replace the host list, keeping the selection when the host is still
    /// known and falling back to the first host otherwise.
    pub fn set_hosts(&mut self, hosts: Vec<String>) {
        self.hosts = ordered_hosts(&hosts, &self.stored_order);
        let keep = self
            .selected
            .as_ref()
            .is_some_and(|h| self.hosts.contains(h));
        if !keep {
            self.selected = self.hosts.first().cloned();
        }
    }

    /// Remember a new card order and re-sort the host list by it.
    pub fn set_stored_order(&mut self, order: Vec<String>) {
        self.stored_order = order;
        let hosts = std::mem::take(&mut self.hosts);
        self.hosts = ordered_hosts(&hosts, &self.stored_order);
    }

    /// Move the selection by `step` hosts, wrapping around.
    /// Returns whether the selection changed.
    pub fn select_host(&mut self, step: isize) -> bool {
        if self.hosts.is_empty() {
            return false;
        }
        let len = self.hosts.len() as isize;
        let current = self
            .selected
            .as_ref()
            .and_then(|h| self.hosts.iter().position(|x| x == h))
            .map(|i| i as isize)
            .unwrap_or(-step.signum());
        let next = (current + step).rem_euclid(len) as usize;
        let changed = self.selected.as_deref() != Some(self.hosts[next].as_str());
        self.selected = Some(self.hosts[next].clone());
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_page_cycle() {
        for page in Page::all() {
            assert_eq!(page.next().prev(), *page);
        }
        assert_eq!(Page::Server.next(), Page::Dashboard);
        assert!(Page::Users.is_periodic());
        assert!(!Page::History.is_periodic());
    }

    #[test]
    fn test_ordered_hosts() {
        let hosts = strings(&["gpu01", "gpu.02", "cpu03"]);
        let stored = strings(&["card-cpu03", "card-gone", "card-gpu_02"]);
        assert_eq!(
            ordered_hosts(&hosts, &stored),
            ["cpu03", "gpu.02", "gpu01"]
        );
        assert_eq!(ordered_hosts(&hosts, &[]), hosts);
    }

    #[test]
    fn test_host_selection() {
        let mut state = AppState::new(Page::History, Some("b".to_string())).unwrap();
        state.set_hosts(strings(&["a", "b", "c"]));
        assert_eq!(state.selected_host(), Some("b"));

        assert!(state.select_host(1));
        assert_eq!(state.selected_host(), Some("c"));
        assert!(state.select_host(1));
        assert_eq!(state.selected_host(), Some("a"));
        assert!(state.select_host(-1));
        assert_eq!(state.selected_host(), Some("c"));

        // unknown preselection falls back to the first host
        let mut state = AppState::new(Page::Server, Some("zzz".to_string())).unwrap();
        state.set_hosts(strings(&["a", "b"]));
        assert_eq!(state.selected_host(), Some("a"));

        let mut empty = AppState::new(Page::Server, None).unwrap();
        assert!(!empty.select_host(1));
        assert_eq!(empty.selected_host(), None);
    }

    #[test]
    fn test_stored_order_reorders_hosts() {
        let mut state = AppState::new(Page::Disk, None).unwrap();
        state.set_hosts(strings(&["a", "b", "c"]));
        state.set_stored_order(strings(&["card-c", "card-a"]));
        assert_eq!(state.hosts, ["c", "a", "b"]);
    }

    #[test]
    fn test_host_panels_time_ago() {
        let mut panels: HostPanels<Vec<DiskRecord>> = HostPanels::default();
        panels.set("h1", Ok(vec![]), Some(1000.0), 1005.0);
        assert_eq!(panels.ago("h1"), Some("5s ago"));

        // nothing due before one second has passed
        assert_eq!(panels.tick(1005.5), 0);
        assert_eq!(panels.tick(1006.0), 1);
        assert_eq!(panels.ago("h1"), Some("6s ago"));

        // a failure keeps the previous timestamp
        panels.set("h1", Err("HTTP 500".to_string()), None, 1007.0);
        assert_eq!(panels.stamp("h1"), Some(1000.0));
        assert!(panels.get("h1").is_some_and(|r| r.is_err()));

        // success without a measurement time drops the row
        panels.set("h1", Ok(vec![]), None, 1008.0);
        assert_eq!(panels.ago("h1"), None);
        assert_eq!(panels.tick(5000.0), 0);
    }

    #[test]
    fn test_dashboard_container_exists() {
        let dash = DashboardState::new().unwrap();
        assert!(dash.view.children(ROOT).contains(&CARD_CONTAINER.to_string()));
        assert!(dash.card_at(0, 0).is_none());
    }

    fn snapshot(host: &str) -> SnapshotRecord {
        SnapshotRecord {
            host: host.to_string(),
            timestamp: 1000.0,
            cpu: 10.0,
            cpu_free: None,
            memory: 20.0,
            memory_free: None,
            cuda: Vec::new(),
            cuda_free: Vec::new(),
            cuda_per_user: Vec::new(),
        }
    }

    #[test]
    fn test_late_card_takes_stored_place() {
        let mut dash = DashboardState::new().unwrap();
        let stored = strings(&["card-c", "card-a", "card-b"]);

        dash.apply(&[snapshot("a"), snapshot("b")], 1000.0, true, &stored)
            .unwrap();
        assert_eq!(dash.view.children(CARD_CONTAINER), ["card-a", "card-b"]);

        // c first reports on a later, incremental poll
        let created = dash
            .apply(&[snapshot("a"), snapshot("b"), snapshot("c")], 1060.0, false, &stored)
            .unwrap();
        assert_eq!(created, 1);
        assert_eq!(
            dash.view.children(CARD_CONTAINER),
            ["card-c", "card-a", "card-b"]
        );
    }

    #[test]
    fn test_history_drops_superseded_answers() {
        let mut history = HistoryPageState::default();
        let first = history.begin("a");
        history.range.shift_start(-1);
        let second = history.begin("a");
        assert_ne!(first, second);

        // the newer window answers first, the older one arrives late
        assert!(history.accept(second.clone(), Ok(HistoryData::default())));
        assert!(!history.accept(first, Err("HTTP 500".to_string())));
        let (result, current) = history.loaded_for("a").unwrap();
        assert!(result.is_ok());
        assert!(current);
        assert!(!history.is_pending("a"));

        // moving the range marks the loaded window as out of date
        history.range.shift_end(-1);
        assert_eq!(history.loaded_for("a").map(|(_, current)| current), Some(false));
        assert!(history.loaded_for("b").is_none());
    }

    #[test]
    fn test_history_switching_hosts() {
        let mut history = HistoryPageState::default();
        let a = history.begin("a");
        let b = history.begin("b");
        assert!(!history.accept(a, Ok(HistoryData::default())));
        assert!(history.is_pending("b"));
        assert!(history.accept(b, Ok(HistoryData::default())));
        assert!(history.loaded_for("b").is_some());
    }

    #[test]
    fn test_server_drops_other_hosts() {
        let mut server = ServerPageState::default();
        server.pending = Some("b".to_string());
        server.scroll = 4;

        assert!(server.accept("b".to_string(), Ok("b report".to_string())));
        assert!(!server.accept("a".to_string(), Ok("a report".to_string())));
        assert_eq!(
            server.loaded,
            Some(("b".to_string(), Ok("b report".to_string())))
        );
        assert_eq!(server.scroll, 0);
        assert_eq!(server.pending, None);
    }
}
