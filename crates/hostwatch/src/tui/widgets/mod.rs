//! TUI widgets.

mod cards;
mod footer;
mod header;
mod quit_confirm;

pub use cards::render_cards;
pub use footer::render_footer;
pub use header::render_header;
pub use quit_confirm::render_quit_confirm;
