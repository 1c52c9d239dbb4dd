//! Key hints for the current page.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::state::Page;
use crate::tui::style::Styles;

/// `(key, description)` pairs shown for `page`.
pub fn hints(page: Page, editing: bool) -> Vec<(&'static str, &'static str)> {
    let mut out = match page {
        Page::Dashboard if editing => vec![("drag", "move card"), ("e/Esc", "done")],
        Page::Dashboard => vec![("e", "edit layout"), ("↑↓", "scroll")],
        Page::Disk => vec![("c", "colour mode"), ("n", "normalize"), ("↑↓", "scroll")],
        Page::History => vec![
            ("←→", "host"),
            ("-/+", "start"),
            ("[/]", "end"),
            ("Enter", "load"),
        ],
        Page::Users => vec![("s", "sort"), ("↑↓", "scroll")],
        Page::Server => vec![("←→", "host"), ("Enter", "load"), ("↑↓", "scroll")],
    };
    out.extend([("r", "refresh"), ("Tab", "page"), ("q", "quit")]);
    out
}

/// Renders the hint line.
pub fn render_footer(frame: &mut Frame, area: Rect, page: Page, editing: bool) {
    let spans: Vec<Span> = hints(page, editing)
        .into_iter()
        .flat_map(|(key, what)| {
            [
                Span::styled(format!(" {}", key), Styles::key()),
                Span::styled(format!(" {} ", what), Styles::dim()),
            ]
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints() {
        let dash = hints(Page::Dashboard, false);
        assert_eq!(dash[0], ("e", "edit layout"));
        assert_eq!(dash.last(), Some(&("q", "quit")));
        assert_eq!(hints(Page::Dashboard, true)[0], ("drag", "move card"));
    }
}
