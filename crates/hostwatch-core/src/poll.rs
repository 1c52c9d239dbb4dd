//! Periodic refresh and the background poller.
//!
//! [`RefreshCycle`] is the pure part: it says when the next fetch is due and
//! whether a successful result should be rendered from scratch or patched in.
//! [`Poller`] runs fetches as independent tokio tasks and sends every result
//! back over a channel to the UI thread.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::source::{FetchError, MetricsSource, Request, Update};

/// Default refresh interval in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 60.0;

/// How a successful fetch should reach the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// First data for this view: build everything.
    Full,
    /// Patch existing elements by identifier.
    Incremental,
}

/// Refresh bookkeeping for one view.
#[derive(Debug, Clone)]
pub struct RefreshCycle {
    interval: f64,
    last_started: Option<f64>,
    rendered: bool,
}

impl Default for RefreshCycle {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_SECS)
    }
}

impl RefreshCycle {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval: interval_secs.max(1.0),
            last_started: None,
            rendered: false,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// A fetch is due immediately at start, then every interval.
    pub fn is_due(&self, now: f64) -> bool {
        self.last_started.is_none_or(|last| now - last >= self.interval)
    }

    /// When the next fetch is due; `None` means right away.
    pub fn next_due(&self) -> Option<f64> {
        self.last_started.map(|last| last + self.interval)
    }

    /// Record that a fetch was started at `now`.
    pub fn started(&mut self, now: f64) {
        self.last_started = Some(now);
    }

    /// Record a successful result; the first one renders in full.
    pub fn succeeded(&mut self) -> RenderKind {
        if self.rendered {
            RenderKind::Incremental
        } else {
            self.rendered = true;
            RenderKind::Full
        }
    }

    /// Forget everything: the next fetch is immediate and renders in full.
    pub fn reset(&mut self) {
        self.last_started = None;
        self.rendered = false;
    }
}

/// Runs [`Request`]s on a tokio runtime and reports [`Update`]s.
///
/// `T` is the UI thread's event type; anything convertible from an
/// [`Update`] can be fed straight into the UI's event channel.
pub struct Poller<S, T> {
    source: Arc<S>,
    tx: Sender<T>,
    runtime: Handle,
}

impl<S, T> Poller<S, T>
where
    S: MetricsSource,
    T: From<Update> + Send + 'static,
{
    pub fn new(source: Arc<S>, tx: Sender<T>, runtime: Handle) -> Self {
        Self { source, tx, runtime }
    }

    /// Start `request` in the background. Returns immediately.
    pub fn request(&self, request: Request) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let runtime = self.runtime.clone();
        tracing::debug!(?request, "fetch started");
        self.runtime.spawn(async move {
            match request {
                Request::Dashboard => {
                    let result = source.dashboard().await;
                    log_failure("dashboard", None, &result);
                    send(&tx, Update::Dashboard(result));
                }
                Request::Hosts => {
                    let result = source.hosts().await;
                    log_failure("hosts", None, &result);
                    send(&tx, Update::Hosts(result));
                }
                Request::Disk => {
                    for_each_host(&runtime, source, tx, |source, host| async move {
                        let result = source.disk(&host).await;
                        log_failure("disk", Some(host.as_str()), &result);
                        Update::Disk { host, result }
                    })
                    .await
                }
                Request::Summary => {
                    for_each_host(&runtime, source, tx, |source, host| async move {
                        let result = source.summary(&host).await;
                        log_failure("summary", Some(host.as_str()), &result);
                        Update::Summary { host, result }
                    })
                    .await
                }
                Request::History { host, start, end } => {
                    let result = source.history(&host, start, end).await;
                    log_failure("history", Some(host.as_str()), &result);
                    send(&tx, Update::History { host, start, end, result });
                }
                Request::ServerInfo { host } => {
                    let result = source.server_info(&host).await;
                    log_failure("server_info", Some(host.as_str()), &result);
                    send(&tx, Update::ServerInfo { host, result });
                }
            }
        });
    }
}

/// Fetch the host list, report it, then run `per_host` for every host as its
/// own task so each result is sent as soon as it is ready.
async fn for_each_host<S, T, F, Fut>(
    runtime: &Handle,
    source: Arc<S>,
    tx: Sender<T>,
    per_host: F,
) where
    S: MetricsSource,
    T: From<Update> + Send + 'static,
    F: Fn(Arc<S>, String) -> Fut,
    Fut: std::future::Future<Output = Update> + Send + 'static,
{
    let hosts = source.hosts().await;
    log_failure("hosts", None, &hosts);
    let list = hosts.as_ref().cloned().unwrap_or_default();
    send(&tx, Update::Hosts(hosts));

    for host in list {
        let fut = per_host(Arc::clone(&source), host);
        let tx = tx.clone();
        runtime.spawn(async move {
            send(&tx, fut.await);
        });
    }
}

fn send<T: From<Update>>(tx: &Sender<T>, update: Update) {
    // the UI has gone away; nothing left to deliver to
    let _ = tx.send(T::from(update));
}

fn log_failure<V>(what: &str, host: Option<&str>, result: &Result<V, FetchError>) {
    if let Err(e) = result {
        match host {
            Some(host) => tracing::warn!(endpoint = what, host = %host, error = %e, "fetch failed"),
            None => tracing::warn!(endpoint = what, error = %e, "fetch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::model::{DiskRecord, SnapshotRecord, UserSummaryRecord};

    #[test]
    fn test_refresh_cycle() {
        let mut cycle = RefreshCycle::new(60.0);
        assert!(cycle.is_due(0.0));
        assert_eq!(cycle.next_due(), None);

        cycle.started(100.0);
        assert!(!cycle.is_due(159.0));
        assert!(cycle.is_due(160.0));
        assert_eq!(cycle.next_due(), Some(160.0));

        assert_eq!(cycle.succeeded(), RenderKind::Full);
        assert_eq!(cycle.succeeded(), RenderKind::Incremental);

        cycle.reset();
        assert!(cycle.is_due(100.5));
        assert_eq!(cycle.succeeded(), RenderKind::Full);
    }

    #[test]
    fn test_interval_floor() {
        assert_eq!(RefreshCycle::new(0.0).interval(), 1.0);
        assert_eq!(RefreshCycle::default().interval(), 60.0);
    }

    /// Source whose per-host behaviour is scripted: delay in ms, or failure.
    struct Scripted {
        hosts: Vec<String>,
        delay_ms: HashMap<String, u64>,
        failing: Vec<String>,
    }

    impl Scripted {
        async fn per_host<V: Default>(&self, host: &str) -> Result<V, FetchError> {
            if let Some(ms) = self.delay_ms.get(host) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.failing.iter().any(|h| h == host) {
                Err(FetchError::Status {
                    status: 500,
                    body: String::new(),
                })
            } else {
                Ok(V::default())
            }
        }
    }

    impl MetricsSource for Scripted {
        async fn dashboard(&self) -> Result<Vec<SnapshotRecord>, FetchError> {
            Err(FetchError::Network("offline".into()))
        }

        async fn hosts(&self) -> Result<Vec<String>, FetchError> {
            Ok(self.hosts.clone())
        }

        async fn disk(&self, host: &str) -> Result<Vec<DiskRecord>, FetchError> {
            self.per_host(host).await
        }

        async fn history(
            &self,
            host: &str,
            _start: i64,
            _end: i64,
        ) -> Result<Vec<SnapshotRecord>, FetchError> {
            self.per_host(host).await
        }

        async fn summary(&self, host: &str) -> Result<Vec<UserSummaryRecord>, FetchError> {
            self.per_host(host).await
        }

        async fn server_info(&self, host: &str) -> Result<String, FetchError> {
            self.per_host(host).await
        }
    }

    fn scripted() -> Arc<Scripted> {
        Arc::new(Scripted {
            hosts: vec!["slow".into(), "bad".into(), "good".into()],
            delay_ms: HashMap::from([("slow".to_string(), 300)]),
            failing: vec!["bad".into()],
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hosts_are_isolated() {
        let (tx, rx) = mpsc::channel::<Update>();
        let poller = Poller::new(scripted(), tx, Handle::current());
        poller.request(Request::Disk);

        let recv = || rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            recv(),
            Update::Hosts(Ok(vec!["slow".into(), "bad".into(), "good".into()]))
        );

        let mut order = Vec::new();
        for _ in 0..3 {
            let update = recv();
            let host = update.host().unwrap().to_string();
            if host == "bad" {
                assert!(update.error().is_some());
            } else {
                assert!(update.error().is_none());
            }
            order.push(host);
        }
        // the slow host neither blocks nor is dropped
        assert_eq!(order.last().map(String::as_str), Some("slow"));
        assert!(order.contains(&"good".to_string()));
        assert!(order.contains(&"bad".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failures_are_delivered_not_fatal() {
        let (tx, rx) = mpsc::channel::<Update>();
        let poller = Poller::new(scripted(), tx, Handle::current());
        poller.request(Request::Dashboard);
        poller.request(Request::ServerInfo { host: "bad".into() });

        let mut got = vec![
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        ];
        got.sort_by_key(|u| u.host().is_some());
        assert_eq!(
            got[0],
            Update::Dashboard(Err(FetchError::Network("offline".into())))
        );
        assert_eq!(got[1].host(), Some("bad"));
        assert!(got[1].error().is_some());
    }
}
