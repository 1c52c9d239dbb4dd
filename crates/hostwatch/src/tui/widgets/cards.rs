//! Dashboard card grid.
//!
//! Walks the card container of the view tree and draws each node by kind.
//! Screen areas of the drawn cards are recorded for mouse hit-testing.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use hostwatch_core::color::Rgb;
use hostwatch_core::view::{Node, NodeKind, ViewTree};

use crate::tui::state::{CARD_CONTAINER, DashboardState};
use crate::tui::style::{Styles, rgb};

/// Card width in columns, borders included.
const CARD_WIDTH: u16 = 38;

/// Cards per row for a given width.
pub fn columns(width: u16) -> u16 {
    (width / CARD_WIDTH).max(1)
}

/// Height of the tallest visible card: one line per child plus borders.
fn card_height(view: &ViewTree, nodes: &[&Node]) -> u16 {
    nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Card)
        .map(|n| view.visible_children(&n.id).len() as u16 + 2)
        .max()
        .unwrap_or(12)
}

/// Renders the card container.
pub fn render_cards(frame: &mut Frame, area: Rect, dash: &mut DashboardState) {
    dash.card_rects.clear();
    let view = &dash.view;
    let mut nodes = view.visible_children(CARD_CONTAINER);

    let mut area = area;
    if let Some(banner) = nodes.first().filter(|n| n.kind == NodeKind::Banner) {
        let strip = Rect::new(area.x, area.y, area.width, area.height.min(1));
        frame.render_widget(
            Paragraph::new(format!(" {} ", banner.text)).style(Styles::edit()),
            strip,
        );
        area.y += strip.height;
        area.height -= strip.height;
        nodes.remove(0);
    }

    if nodes.is_empty() {
        frame.render_widget(
            Paragraph::new("Waiting for the first snapshot...").style(Styles::dim()),
            area,
        );
        return;
    }

    let cols = columns(area.width);
    let width = area.width / cols;
    let height = card_height(view, &nodes);
    let skip = usize::from(dash.scroll) * usize::from(cols);

    for (i, node) in nodes.iter().enumerate().skip(skip) {
        let slot = (i - skip) as u16;
        let x = area.x + (slot % cols) * width;
        let y = area.y + (slot / cols) * height;
        if y + height > area.y + area.height {
            break;
        }
        let rect = Rect::new(x, y, width, height);
        match node.kind {
            NodeKind::Card => {
                draw_card(frame, rect, view, node);
                dash.card_rects.push((node.id.clone(), rect));
            }
            NodeKind::Placeholder => {
                let host = dash.cards.host_of(&node.text).unwrap_or(&node.text);
                draw_placeholder(frame, rect, host);
            }
            _ => {}
        }
    }
}

fn draw_card(frame: &mut Frame, rect: Rect, view: &ViewTree, card: &Node) {
    let border = card.border.unwrap_or(Rgb::NEUTRAL);
    let block = Block::bordered().border_style(Style::default().fg(rgb(border)));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let lines: Vec<Line> = view
        .visible_children(&card.id)
        .into_iter()
        .enumerate()
        .map(|(i, node)| node_line(view, node, inner.width, i == 0))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn node_line<'a>(view: &'a ViewTree, node: &'a Node, width: u16, first: bool) -> Line<'a> {
    match node.kind {
        NodeKind::Text => {
            let mut style = Styles::default();
            if let Some(fg) = node.foreground {
                style = style.fg(rgb(fg));
            }
            if first {
                style = style.add_modifier(Modifier::BOLD);
            }
            Line::from(Span::styled(node.text.as_str(), style))
        }
        NodeKind::Bar => bar_line(node.width.unwrap_or(0.0), node.background, width),
        NodeKind::Row => Line::from(
            view.visible_children(&node.id)
                .into_iter()
                .flat_map(|gpu| {
                    let mut style = Style::default();
                    if let Some(bg) = gpu.background {
                        style = style.bg(rgb(bg));
                    }
                    if let Some(fg) = gpu.foreground {
                        style = style.fg(rgb(fg));
                    }
                    [Span::styled(format!(" {} ", gpu.text), style), Span::raw(" ")]
                })
                .collect::<Vec<_>>(),
        ),
        _ => Line::default(),
    }
}

/// Filled cells for a bar of `percent` across `width` columns.
pub fn bar_cells(percent: f64, width: u16) -> u16 {
    let share = (percent / 100.0).clamp(0.0, 1.0);
    (share * f64::from(width)).round() as u16
}

fn bar_line(percent: f64, colour: Option<Rgb>, width: u16) -> Line<'static> {
    let filled = bar_cells(percent, width);
    let colour = colour.unwrap_or(Rgb::NEUTRAL);
    Line::from(vec![
        Span::styled("█".repeat(usize::from(filled)), Style::default().fg(rgb(colour))),
        Span::styled("░".repeat(usize::from(width - filled)), Styles::dim()),
    ])
}

fn draw_placeholder(frame: &mut Frame, rect: Rect, host: &str) {
    let block = Block::bordered()
        .border_style(Styles::dim())
        .title(Span::styled(format!(" {} ", host), Styles::dim()));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    frame.render_widget(Paragraph::new("drop here").style(Styles::dim()), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_cells() {
        assert_eq!(bar_cells(50.0, 30), 15);
        assert_eq!(bar_cells(0.0, 30), 0);
        assert_eq!(bar_cells(150.0, 30), 30);
        assert_eq!(bar_cells(-5.0, 30), 0);
    }

    #[test]
    fn test_columns() {
        assert_eq!(columns(10), 1);
        assert_eq!(columns(76), 2);
        assert_eq!(columns(120), 3);
    }
}
