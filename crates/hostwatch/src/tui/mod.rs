//! Terminal user interface for hostwatch.
//!
//! The UI thread owns the view tree, the engines and the order store.
//! Fetches run on the tokio runtime and come back as `Event::Fetched`.

mod app;
mod event;
mod input;
mod pages;
mod render;
pub(crate) mod state;
pub(crate) mod style;
mod widgets;

pub use app::{App, AppConfig};
pub use state::Page;
