//! Page bodies other than the dashboard grid.

pub mod disk;
pub mod history;
pub mod server;
pub mod users;

use ratatui::text::{Line, Span};

use hostwatch_core::fmt::format_timestamp;

use super::style::Styles;

/// Panel title for a host: name plus the last update time when known.
pub fn panel_title<'a>(host: &'a str, stamp: Option<f64>, ago: Option<&'a str>) -> Line<'a> {
    let mut spans = vec![Span::styled(format!(" {} ", host), Styles::title())];
    if let Some(ts) = stamp {
        let when = match ago {
            Some(ago) => format!("Last Update: {} ({}) ", format_timestamp(ts), ago),
            None => format!("Last Update: {} ", format_timestamp(ts)),
        };
        spans.push(Span::styled(when, Styles::dim()));
    }
    Line::from(spans)
}

/// `◀ host ▶` selector line for the per-host pages.
pub fn host_selector(hosts: &[String], selected: Option<&str>) -> Line<'static> {
    let Some(host) = selected else {
        return Line::from(Span::styled(" no hosts known yet", Styles::dim()));
    };
    let position = hosts
        .iter()
        .position(|h| h == host)
        .map(|i| format!(" ({}/{})", i + 1, hosts.len()))
        .unwrap_or_default();
    Line::from(vec![
        Span::styled(" ◀ ", Styles::key()),
        Span::styled(host.to_string(), Styles::title()),
        Span::styled(" ▶", Styles::key()),
        Span::styled(position, Styles::dim()),
    ])
}
