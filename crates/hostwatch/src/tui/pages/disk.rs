//! Disk usage page: one panel per host, one pie per disk.
//!
//! Pies are rasterized onto a braille canvas. Every sub-cell point inside
//! the circle is assigned to the slice whose arc contains its angle, so the
//! slices stay exact regardless of how many users share a disk.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{Block, Paragraph};

use hostwatch_core::charts::{disk_pies, PieSpec};
use hostwatch_core::fmt::truncate;

use super::panel_title;
use crate::tui::state::DiskPageState;
use crate::tui::style::{rgb, Styles};

/// Rows per host panel, borders included.
const PANEL_HEIGHT: u16 = 14;

/// Pie radius in canvas units; the short axis spans -1..1.
const RADIUS: f64 = 0.9;

/// Index of the arc containing `angle` (degrees, counter-clockwise from
/// 3 o'clock). Arcs are `(start, span)` with negative spans running
/// clockwise, as produced by [`PieSpec::arcs`].
pub fn slice_at(arcs: &[(f64, f64)], angle: f64) -> Option<usize> {
    arcs.iter().position(|(start, span)| {
        let offset = (start - angle).rem_euclid(360.0);
        offset < -span
    })
}

/// Canvas bounds keeping the pie round on cells twice as tall as wide.
pub fn bounds(width: u16, height: u16) -> ([f64; 2], [f64; 2]) {
    let ratio = f64::from(width) / (2.0 * f64::from(height.max(1)));
    if ratio >= 1.0 {
        ([-ratio, ratio], [-1.0, 1.0])
    } else {
        ([-1.0, 1.0], [-1.0 / ratio, 1.0 / ratio])
    }
}

/// Canvas coordinates of the centre of a terminal cell inside `area`.
fn cell_to_canvas(area: Rect, column: u16, row: u16) -> Option<(f64, f64)> {
    if column < area.x
        || row < area.y
        || column >= area.x + area.width
        || row >= area.y + area.height
    {
        return None;
    }
    let (xb, yb) = bounds(area.width, area.height);
    let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
    let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
    Some((xb[0] + fx * (xb[1] - xb[0]), yb[1] - fy * (yb[1] - yb[0])))
}

fn angle_of(x: f64, y: f64) -> f64 {
    y.atan2(x).to_degrees()
}

/// Slice under a canvas point, if the point lies on the pie.
fn hit(pie: &PieSpec, arcs: &[(f64, f64)], x: f64, y: f64) -> Option<usize> {
    if x * x + y * y > RADIUS * RADIUS || pie.slices.is_empty() {
        return None;
    }
    slice_at(arcs, angle_of(x, y))
}

pub fn render(frame: &mut Frame, area: Rect, hosts: &[String], state: &DiskPageState) {
    let [modes, body] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);
    frame.render_widget(
        Paragraph::new(format!(" {} · {}", state.colour, state.norm)).style(Styles::dim()),
        modes,
    );

    if hosts.is_empty() {
        frame.render_widget(
            Paragraph::new("Waiting for the host list...").style(Styles::dim()),
            body,
        );
        return;
    }

    let mut y = body.y;
    for host in hosts.iter().skip(usize::from(state.scroll)) {
        if y + PANEL_HEIGHT > body.y + body.height {
            break;
        }
        let rect = Rect::new(body.x, y, body.width, PANEL_HEIGHT);
        render_host(frame, rect, host, state);
        y += PANEL_HEIGHT;
    }
}

fn render_host(frame: &mut Frame, rect: Rect, host: &str, state: &DiskPageState) {
    let block = Block::bordered().title(panel_title(
        host,
        state.panels.stamp(host),
        state.panels.ago(host),
    ));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let disks = match state.panels.get(host) {
        None => {
            frame.render_widget(Paragraph::new("loading...").style(Styles::dim()), inner);
            return;
        }
        Some(Err(e)) => {
            frame.render_widget(
                Paragraph::new(format!("failed to load: {}", e)).style(Styles::error()),
                inner,
            );
            return;
        }
        Some(Ok(disks)) => disks,
    };
    if disks.is_empty() {
        frame.render_widget(
            Paragraph::new("no disks reported").style(Styles::dim()),
            inner,
        );
        return;
    }

    let pies = disk_pies(disks, state.colour, state.norm);
    let areas = Layout::horizontal(vec![Constraint::Ratio(1, pies.len() as u32); pies.len()])
        .split(inner);
    for (pie, area) in pies.iter().zip(areas.iter()) {
        draw_pie(frame, *area, pie, state.hover);
    }
}

fn draw_pie(frame: &mut Frame, area: Rect, pie: &PieSpec, hover: Option<(u16, u16)>) {
    let block = Block::default()
        .title(Span::styled(format!(" {} ", pie.title), Styles::title()))
        .title_bottom(Line::from(Span::styled(pie.subtitle.clone(), Styles::dim())).centered());
    let canvas_area = block.inner(area);
    frame.render_widget(block, area);
    if canvas_area.width == 0 || canvas_area.height == 0 {
        return;
    }

    let arcs = pie.arcs();
    let (xb, yb) = bounds(canvas_area.width, canvas_area.height);

    // braille gives 2x4 points per cell
    let cols = usize::from(canvas_area.width) * 2;
    let rows = usize::from(canvas_area.height) * 4;
    let mut coords: Vec<Vec<(f64, f64)>> = vec![Vec::new(); pie.slices.len()];
    for py in 0..rows {
        let y = yb[1] - (py as f64 + 0.5) / rows as f64 * (yb[1] - yb[0]);
        for px in 0..cols {
            let x = xb[0] + (px as f64 + 0.5) / cols as f64 * (xb[1] - xb[0]);
            if let Some(i) = hit(pie, &arcs, x, y) {
                coords[i].push((x, y));
            }
        }
    }

    let labels: Vec<(f64, f64, String)> = pie
        .slices
        .iter()
        .zip(&arcs)
        .filter_map(|(slice, (start, span))| {
            let label = slice.label()?;
            let mid = (start + span / 2.0).to_radians();
            let at = RADIUS * 0.55;
            Some((at * mid.cos() - 0.3, at * mid.sin(), truncate(&label, 18)))
        })
        .collect();

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds(xb)
        .y_bounds(yb)
        .paint(|ctx| {
            for (slice, points) in pie.slices.iter().zip(&coords) {
                ctx.draw(&Points {
                    coords: points,
                    color: rgb(slice.colour),
                });
            }
            ctx.layer();
            for (x, y, text) in &labels {
                ctx.print(*x, *y, Line::styled(text.clone(), Styles::default()));
            }
        });
    frame.render_widget(canvas, canvas_area);

    let tooltip = hover
        .and_then(|(column, row)| cell_to_canvas(canvas_area, column, row))
        .and_then(|(x, y)| hit(pie, &arcs, x, y))
        .map(|i| pie.slices[i].tooltip());
    if let Some(text) = tooltip {
        let line = Rect::new(
            canvas_area.x,
            canvas_area.y + canvas_area.height - 1,
            canvas_area.width,
            1,
        );
        frame.render_widget(
            Paragraph::new(truncate(&text, usize::from(line.width)))
                .style(Styles::header()),
            line,
        );
    }
}
