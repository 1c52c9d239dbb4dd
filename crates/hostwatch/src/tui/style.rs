//! Color scheme and styles.

use ratatui::style::{Color, Modifier, Style};

use hostwatch_core::color::Rgb;

/// Terminal palette.
pub struct Theme;

impl Theme {
    pub const BG: Color = Color::Reset;
    pub const HEADER_BG: Color = Color::Blue;

    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;
    pub const HEADER_FG: Color = Color::White;

    pub const TAB_ACTIVE: Color = Color::Cyan;
    pub const TAB_INACTIVE: Color = Color::Gray;

    pub const ERROR: Color = Color::Red;
    pub const EDIT: Color = Color::Yellow;

    pub const CPU_COLOR: Color = Color::Cyan;
    pub const MEM_COLOR: Color = Color::Magenta;
}

/// Converts an engine colour to a terminal colour.
pub fn rgb(c: Rgb) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Pre-defined styles.
pub struct Styles;

impl Styles {
    /// Default text style.
    pub fn default() -> Style {
        Style::default().fg(Theme::FG).bg(Theme::BG)
    }

    /// Header bar style.
    pub fn header() -> Style {
        Style::default()
            .fg(Theme::HEADER_FG)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_active() -> Style {
        Style::default()
            .fg(Theme::TAB_ACTIVE)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive() -> Style {
        Style::default().fg(Theme::TAB_INACTIVE).bg(Theme::HEADER_BG)
    }

    /// Dimmed text (hints, separators, placeholders).
    pub fn dim() -> Style {
        Style::default().fg(Theme::FG_DIM)
    }

    pub fn error() -> Style {
        Style::default().fg(Theme::ERROR)
    }

    /// Edit mode banner and indicator.
    pub fn edit() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Theme::EDIT)
            .add_modifier(Modifier::BOLD)
    }

    /// Panel and table titles.
    pub fn title() -> Style {
        Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD)
    }

    /// Key names in hints.
    pub fn key() -> Style {
        Style::default().fg(Color::Yellow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb() {
        assert_eq!(rgb(Rgb::HOT), Color::Rgb(0xd6, 0x30, 0x31));
    }
}
