//! History page: CPU, memory and stacked GPU memory over a date window for
//! the selected host, plus per-user GPU totals.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph, Row, Table};

use hostwatch_core::charts::{HistorySeries, UserGpuStat};

use super::host_selector;
use crate::tui::state::{AppState, HistoryData};
use crate::tui::style::{Styles, Theme};

const GPU_COLORS: [Color; 6] = [
    Color::Green,
    Color::Yellow,
    Color::LightBlue,
    Color::LightRed,
    Color::LightMagenta,
    Color::LightCyan,
];

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let [top, body] = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);

    let history = &state.history;
    let loaded = state
        .selected_host()
        .and_then(|host| history.loaded_for(host));
    let mut line = host_selector(&state.hosts, state.selected_host());
    line.spans.push(Span::styled(
        format!("   {} → {}", history.range.start, history.range.end),
        Styles::default(),
    ));
    if loaded.is_some_and(|(_, current)| !current) {
        line.spans
            .push(Span::styled("  (Enter to reload this range)", Styles::dim()));
    }
    frame.render_widget(Paragraph::new(line), top);

    let Some(host) = state.selected_host() else {
        return;
    };
    if history.is_pending(host) {
        frame.render_widget(
            Paragraph::new(format!("loading {}...", host)).style(Styles::dim()),
            body,
        );
        return;
    }
    let Some((data, _)) = loaded else {
        frame.render_widget(
            Paragraph::new("press Enter to load this host").style(Styles::dim()),
            body,
        );
        return;
    };
    match data {
        Err(e) => frame.render_widget(
            Paragraph::new(format!("failed to load: {}", e)).style(Styles::error()),
            body,
        ),
        Ok(data) if data.series.is_empty() => frame.render_widget(
            Paragraph::new("no samples in this window").style(Styles::dim()),
            body,
        ),
        Ok(data) => render_charts(frame, body, data),
    }
}

fn render_charts(frame: &mut Frame, area: Rect, data: &HistoryData) {
    let users_height = (data.users.len() as u16 + 3).min(area.height / 3);
    let [usage, gpu, users] = Layout::vertical([
        Constraint::Percentage(50),
        Constraint::Min(5),
        Constraint::Length(users_height),
    ])
    .areas(area);

    render_usage(frame, usage, &data.series);
    render_gpu(frame, gpu, &data.series);
    frame.render_widget(user_table(&data.users), users);
}

/// `(time, value)` points for one series.
fn points(times: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    times.iter().copied().zip(values.iter().copied()).collect()
}

/// First, middle and last axis labels.
fn time_axis(series: &HistorySeries) -> Axis<'static> {
    let first = series.times.first().copied().unwrap_or(0.0);
    let last = series.times.last().copied().unwrap_or(0.0);
    let labels: Vec<Line> = match series.labels.len() {
        0 => Vec::new(),
        1 => vec![Line::from(series.labels[0].clone())],
        n => vec![
            Line::from(series.labels[0].clone()),
            Line::from(series.labels[n / 2].clone()),
            Line::from(series.labels[n - 1].clone()),
        ],
    };
    Axis::default()
        .style(Styles::dim())
        .bounds([first, last.max(first + 1.0)])
        .labels(labels)
}

fn value_axis(title: &str, max: f64, unit: &str) -> Axis<'static> {
    Axis::default()
        .title(title.to_string())
        .style(Styles::dim())
        .bounds([0.0, max])
        .labels(vec![
            Line::from(format!("0{}", unit)),
            Line::from(format!("{:.0}{}", max / 2.0, unit)),
            Line::from(format!("{:.0}{}", max, unit)),
        ])
}

fn render_usage(frame: &mut Frame, area: Rect, series: &HistorySeries) {
    let cpu = points(&series.times, &series.cpu);
    let memory = points(&series.times, &series.memory);
    let max = series
        .cpu
        .iter()
        .chain(&series.memory)
        .copied()
        .fold(100.0, f64::max);

    let datasets = vec![
        Dataset::default()
            .name("CPU")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Theme::CPU_COLOR))
            .data(&cpu),
        Dataset::default()
            .name("MEM")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Theme::MEM_COLOR))
            .data(&memory),
    ];
    let chart = Chart::new(datasets)
        .block(Block::bordered().title(Span::styled(" CPU / Memory ", Styles::title())))
        .x_axis(time_axis(series))
        .y_axis(value_axis("%", max, "%"));
    frame.render_widget(chart, area);
}

fn render_gpu(frame: &mut Frame, area: Rect, series: &HistorySeries) {
    let block = Block::bordered().title(Span::styled(" GPU memory (stacked) ", Styles::title()));
    if series.gpus.is_empty() {
        frame.render_widget(
            Paragraph::new("no GPUs on this host")
                .style(Styles::dim())
                .block(block),
            area,
        );
        return;
    }

    let stacked: Vec<Vec<(f64, f64)>> = series
        .stacked()
        .iter()
        .map(|values| points(&series.times, values))
        .collect();
    let names = series.device_names();
    // top of the stack first so lower devices draw over it
    let datasets: Vec<Dataset> = stacked
        .iter()
        .zip(names)
        .enumerate()
        .rev()
        .map(|(i, (data, name))| {
            Dataset::default()
                .name(name)
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(GPU_COLORS[i % GPU_COLORS.len()]))
                .data(data)
        })
        .collect();

    let max = series.gpu_axis_max().max(1.0);
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(time_axis(series))
        .y_axis(value_axis("GiB", max, ""));
    frame.render_widget(chart, area);
}

fn user_table(users: &[UserGpuStat]) -> Table<'static> {
    let block = Block::bordered().title(Span::styled(" GPU memory by user ", Styles::title()));
    let header = Row::new(["User", "GiB·h", "Peak GiB"]).style(Styles::title());
    let rows: Vec<Row> = users
        .iter()
        .map(|u| {
            Row::new([
                u.user.clone(),
                format!("{:.2}", u.total_gib_h),
                format!("{:.1}", u.peak_gib),
            ])
        })
        .collect();
    Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(block)
    .style(Styles::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_align_with_times() {
        assert_eq!(
            points(&[1.0, 2.0, 3.0], &[10.0, 20.0]),
            vec![(1.0, 10.0), (2.0, 20.0)]
        );
    }
}
