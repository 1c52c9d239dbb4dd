//! Metrics source abstraction.
//!
//! This module defines the `MetricsSource` trait through which the poller
//! reaches the backend, the requests it understands and the updates it
//! delivers back to the UI thread.

#[cfg(feature = "http")]
pub mod http;

use std::future::Future;

use crate::model::{DiskRecord, SnapshotRecord, UserSummaryRecord};

/// Error types that can occur while fetching from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response (connect, timeout, reset).
    Network(String),
    /// The backend answered with a non-success status.
    Status { status: u16, body: String },
    /// The response body did not decode into the expected records.
    Malformed(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Status { status, body } if body.trim().is_empty() => {
                write!(f, "HTTP {}", status)
            }
            FetchError::Status { status, body } => write!(f, "HTTP {}: {}", status, body.trim()),
            FetchError::Malformed(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Abstraction for backend data sources.
///
/// One method per backend endpoint. Implementations must be shareable across
/// tasks: the poller holds one behind an `Arc` and calls it from many tokio
/// tasks at once, one per host.
pub trait MetricsSource: Send + Sync + 'static {
    /// Latest snapshot of every host.
    fn dashboard(&self) -> impl Future<Output = Result<Vec<SnapshotRecord>, FetchError>> + Send;

    /// Known host names.
    fn hosts(&self) -> impl Future<Output = Result<Vec<String>, FetchError>> + Send;

    /// Physical disks of one host.
    fn disk(&self, host: &str)
    -> impl Future<Output = Result<Vec<DiskRecord>, FetchError>> + Send;

    /// Snapshots of one host within `[start, end)` epoch seconds.
    fn history(
        &self,
        host: &str,
        start: i64,
        end: i64,
    ) -> impl Future<Output = Result<Vec<SnapshotRecord>, FetchError>> + Send;

    /// Current per-user usage on one host.
    fn summary(
        &self,
        host: &str,
    ) -> impl Future<Output = Result<Vec<UserSummaryRecord>, FetchError>> + Send;

    /// Free-form diagnostic text for one host, shown verbatim.
    fn server_info(&self, host: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Work the poller can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Dashboard,
    Hosts,
    /// Host list, then every host's disks independently.
    Disk,
    /// Host list, then every host's user summary independently.
    Summary,
    History { host: String, start: i64, end: i64 },
    ServerInfo { host: String },
}

/// A finished fetch, delivered to the UI thread.
///
/// Per-host results travel separately so one slow or failing host never
/// holds back the others.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Dashboard(Result<Vec<SnapshotRecord>, FetchError>),
    Hosts(Result<Vec<String>, FetchError>),
    Disk {
        host: String,
        result: Result<Vec<DiskRecord>, FetchError>,
    },
    Summary {
        host: String,
        result: Result<Vec<UserSummaryRecord>, FetchError>,
    },
    /// Carries the window it was asked for so a late answer can be told
    /// apart from the current one.
    History {
        host: String,
        start: i64,
        end: i64,
        result: Result<Vec<SnapshotRecord>, FetchError>,
    },
    ServerInfo {
        host: String,
        result: Result<String, FetchError>,
    },
}

impl Update {
    /// Host the update belongs to, if it is per-host.
    pub fn host(&self) -> Option<&str> {
        match self {
            Update::Dashboard(_) | Update::Hosts(_) => None,
            Update::Disk { host, .. }
            | Update::Summary { host, .. }
            | Update::History { host, .. }
            | Update::ServerInfo { host, .. } => Some(host),
        }
    }

    /// The error carried by this update, if the fetch failed.
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Update::Dashboard(r) | Update::History { result: r, .. } => r.as_ref().err(),
            Update::Hosts(r) => r.as_ref().err(),
            Update::Disk { result, .. } => result.as_ref().err(),
            Update::Summary { result, .. } => result.as_ref().err(),
            Update::ServerInfo { result, .. } => result.as_ref().err(),
        }
    }
}
