//! hostwatch-core: rendering and incremental-update engines for the
//! hostwatch fleet dashboard.
//!
//! Provides:
//! - `fmt`: timestamp, relative-age and size formatting
//! - `color`: usage-to-colour gradient and contrast selection
//! - `model`: wire records returned by the metrics backend
//! - `view`: view handle interface and the in-memory `ViewTree`
//! - `timers`: self-rearming "time ago" timers keyed by card id
//! - `cards`: card reconciliation (create once, patch in place, staleness)
//! - `charts`: disk pies, history series, per-user statistics and tables
//! - `drag`: edit mode and the drag-reorder reducer
//! - `order`: persisted card order
//! - `source`: metrics source abstraction and fetch errors
//! - `poll`: refresh cycle tracking and the background poller
//!
//! With `http` feature (default):
//! - `source::http`: reqwest-backed client for the backend API

pub mod cards;
pub mod charts;
pub mod color;
pub mod drag;
pub mod fmt;
pub mod model;
pub mod order;
pub mod poll;
pub mod source;
pub mod timers;
pub mod view;

/// Crate version with the git revision it was built from.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("HOSTWATCH_GIT_REV"),
    ")"
);
