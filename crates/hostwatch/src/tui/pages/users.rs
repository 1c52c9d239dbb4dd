//! Per-user resource summary: one table per host, one column per user.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::Span;
use ratatui::widgets::{Block, Paragraph, Row, Table};

use hostwatch_core::charts::{summary_table, SummaryTable};
use hostwatch_core::fmt::truncate;

use super::panel_title;
use crate::tui::state::UsersPageState;
use crate::tui::style::Styles;

/// Rows per host panel: header plus CPU, MEM and GPU, inside borders.
const PANEL_HEIGHT: u16 = 6;
const LABEL_WIDTH: u16 = 5;
const USER_WIDTH: u16 = 12;

pub fn render(frame: &mut Frame, area: Rect, hosts: &[String], state: &UsersPageState) {
    let [modes, body] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);
    frame.render_widget(
        Paragraph::new(format!(" users {}", state.sort)).style(Styles::dim()),
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
        render_host(frame, Rect::new(body.x, y, body.width, PANEL_HEIGHT), host, state);
        y += PANEL_HEIGHT;
    }
}

fn render_host(frame: &mut Frame, rect: Rect, host: &str, state: &UsersPageState) {
    let block = Block::bordered().title(panel_title(
        host,
        state.panels.stamp(host),
        state.panels.ago(host),
    ));

    let records = match state.panels.get(host) {
        None => {
            frame.render_widget(
                Paragraph::new("loading...").style(Styles::dim()).block(block),
                rect,
            );
            return;
        }
        Some(Err(e)) => {
            frame.render_widget(
                Paragraph::new(format!("failed to load: {}", e))
                    .style(Styles::error())
                    .block(block),
                rect,
            );
            return;
        }
        Some(Ok(records)) => records,
    };

    let table = summary_table(records, state.sort);
    if table.users.is_empty() {
        frame.render_widget(
            Paragraph::new("no active users").style(Styles::dim()).block(block),
            rect,
        );
        return;
    }
    frame.render_widget(build_table(&table).block(block), rect);
}

fn build_table(table: &SummaryTable) -> Table<'static> {
    let max = usize::from(USER_WIDTH);
    let header = Row::new(
        std::iter::once(Span::styled("User", Styles::title())).chain(
            table
                .users
                .iter()
                .map(|u| Span::styled(truncate(u, max), Styles::title())),
        ),
    );

    let rows: Vec<Row> = table
        .rows
        .iter()
        .map(|(label, cells)| {
            Row::new(
                std::iter::once(Span::styled(*label, Styles::key()))
                    .chain(cells.iter().map(|c| Span::raw(c.clone()))),
            )
        })
        .collect();

    let widths = std::iter::once(Constraint::Length(LABEL_WIDTH))
        .chain(table.users.iter().map(|_| Constraint::Length(USER_WIDTH)));

    Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .style(Styles::default())
}
