//! Quit confirmation popup widget.

use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Renders a centered quit confirmation popup.
pub fn render_quit_confirm(frame: &mut Frame, area: Rect) {
    let popup_width = (area.width / 2).clamp(36, 52).min(area.width);
    let popup_height = 7.min(area.height);

    let popup_x = area.x + area.width.saturating_sub(popup_width) / 2;
    let popup_y = area.y + area.height.saturating_sub(popup_height) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Exit hostwatch ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let key = Style::default().fg(Color::Yellow);
    let dim = Style::default().fg(Color::DarkGray);
    let content = vec![
        Line::from("Quit and stop polling?"),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", key),
            Span::styled("/", dim),
            Span::styled("q", key),
            Span::styled(" quit   ", dim),
            Span::styled("Esc", key),
            Span::styled("/", dim),
            Span::styled("n", key),
            Span::styled(" stay", dim),
        ]),
    ];

    frame.render_widget(
        Paragraph::new(content)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::White)),
        inner,
    );
}
