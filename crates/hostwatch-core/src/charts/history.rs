//! Time series for the history page.
//!
//! CPU and memory are plotted as recorded. GPU utilization is turned back
//! into used memory per device: a device at `u`% with `f` MiB free is using
//! `u * f / (100 - u)` MiB. At 100% that inversion has no answer, so the
//! device's largest capacity observed in the window stands in for it.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::fmt::format_timestamp_minutes;
use crate::model::SnapshotRecord;

/// Default length of the history range in days, today included.
pub const DEFAULT_RANGE_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Query window
// ---------------------------------------------------------------------------

/// Inclusive range of local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The last [`DEFAULT_RANGE_DAYS`] days ending at `today`.
    pub fn ending(today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(DEFAULT_RANGE_DAYS - 1),
            end: today,
        }
    }

    /// Default range ending today.
    pub fn last_week() -> Self {
        Self::ending(Local::now().date_naive())
    }

    /// Shift the start day, never past the end.
    pub fn shift_start(&mut self, days: i64) {
        let start = self.start + Duration::days(days);
        self.start = start.min(self.end);
    }

    /// Shift the end day, never before the start.
    pub fn shift_end(&mut self, days: i64) {
        let end = self.end + Duration::days(days);
        self.end = end.max(self.start);
    }

    /// `[local midnight of start, local midnight after end)` as epoch seconds.
    pub fn window(&self) -> (i64, i64) {
        (
            local_midnight(self.start),
            local_midnight(self.end + Duration::days(1)),
        )
    }
}

fn local_midnight(date: NaiveDate) -> i64 {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp())
        // midnight skipped by a DST jump: fall back to the UTC reading
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight).timestamp())
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Used MiB reconstructed from utilization and free memory. `None` at or
/// above 100% or for non-finite input.
fn used_mib(usage: f64, free: f64) -> Option<f64> {
    if !(usage < 100.0) || !free.is_finite() {
        return None;
    }
    let used = usage * free / (100.0 - usage);
    used.is_finite().then(|| used.max(0.0))
}

/// Capacity MiB implied by a sample (`used + free`).
fn capacity_mib(usage: f64, free: f64) -> Option<f64> {
    if !(usage < 100.0) || !free.is_finite() {
        return None;
    }
    let cap = 100.0 * free / (100.0 - usage);
    cap.is_finite().then(|| cap.max(0.0))
}

/// Aligned series for one host over a query window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistorySeries {
    /// Epoch seconds, ascending.
    pub times: Vec<f64>,
    /// `YYYY-MM-DD HH:MM` axis labels.
    pub labels: Vec<String>,
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    /// Used GiB per device, one vector per device index, each aligned with `times`.
    pub gpus: Vec<Vec<f64>>,
    /// Largest capacity seen per device, GiB.
    pub ceilings: Vec<f64>,
}

impl HistorySeries {
    pub fn build(mut records: Vec<SnapshotRecord>) -> HistorySeries {
        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let devices = records.iter().map(SnapshotRecord::device_count).max().unwrap_or(0);
        let mut ceilings_mib = vec![None::<f64>; devices];
        let mut last_free = vec![0.0_f64; devices];
        for rec in &records {
            for (i, usage) in rec.cuda.iter().enumerate() {
                let free = rec.cuda_free_at(i);
                last_free[i] = free;
                if let Some(cap) = capacity_mib(*usage, free) {
                    ceilings_mib[i] = Some(ceilings_mib[i].map_or(cap, |c: f64| c.max(cap)));
                }
            }
        }

        let gpus = (0..devices)
            .map(|i| {
                records
                    .iter()
                    .map(|rec| match rec.cuda.get(i) {
                        // device missing from this sample
                        None => 0.0,
                        Some(usage) => {
                            let free = rec.cuda_free_at(i);
                            let mib = used_mib(*usage, free)
                                .or(ceilings_mib[i])
                                .unwrap_or(free.max(0.0));
                            let gib = mib / 1024.0;
                            if gib.is_finite() { gib } else { 0.0 }
                        }
                    })
                    .collect()
            })
            .collect();

        let ceilings = ceilings_mib
            .iter()
            .zip(&last_free)
            .map(|(cap, free)| cap.unwrap_or(free.max(0.0)) / 1024.0)
            .collect();

        HistorySeries {
            times: records.iter().map(|r| r.timestamp).collect(),
            labels: records
                .iter()
                .map(|r| format_timestamp_minutes(r.timestamp))
                .collect(),
            cpu: records.iter().map(|r| r.cpu).collect(),
            memory: records.iter().map(|r| r.memory).collect(),
            gpus,
            ceilings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn device_names(&self) -> Vec<String> {
        (0..self.gpus.len()).map(|i| format!("cuda:{}", i)).collect()
    }

    /// Upper bound of the GPU axis in GiB: the summed device ceilings, raised
    /// to the tallest stack if any sample exceeds it.
    pub fn gpu_axis_max(&self) -> f64 {
        let ceiling: f64 = self.ceilings.iter().sum();
        let tallest = self
            .stacked()
            .last()
            .map(|top| top.iter().copied().fold(0.0, f64::max))
            .unwrap_or(0.0);
        ceiling.max(tallest)
    }

    /// Cumulative GPU series: entry `i` is devices `0..=i` summed.
    pub fn stacked(&self) -> Vec<Vec<f64>> {
        let mut out: Vec<Vec<f64>> = Vec::with_capacity(self.gpus.len());
        for series in &self.gpus {
            let next = match out.last() {
                Some(below) => below.iter().zip(series).map(|(a, b)| a + b).collect(),
                None => series.clone(),
            };
            out.push(next);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: f64, cuda: &[f64], free: &[f64]) -> SnapshotRecord {
        SnapshotRecord {
            host: "h".to_string(),
            timestamp: ts,
            cpu: ts,
            cpu_free: None,
            memory: 50.0,
            memory_free: None,
            cuda: cuda.to_vec(),
            cuda_free: free.to_vec(),
            cuda_per_user: Vec::new(),
        }
    }

    #[test]
    fn test_sorted_and_aligned() {
        let s = HistorySeries::build(vec![
            sample(30.0, &[], &[]),
            sample(10.0, &[], &[]),
            sample(20.0, &[], &[]),
        ]);
        assert_eq!(s.times, [10.0, 20.0, 30.0]);
        assert_eq!(s.cpu, [10.0, 20.0, 30.0]);
        assert_eq!(s.labels.len(), 3);
        assert!(s.gpus.is_empty());
        assert_eq!(s.gpu_axis_max(), 0.0);
    }

    #[test]
    fn test_used_memory_inversion() {
        // 50% with 1024 MiB free -> 1024 MiB used -> 1 GiB
        // 75% with 1024 MiB free -> 3072 MiB used -> 3 GiB
        let s = HistorySeries::build(vec![
            sample(1.0, &[50.0], &[1024.0]),
            sample(2.0, &[75.0], &[1024.0]),
        ]);
        assert_eq!(s.gpus[0], [1.0, 3.0]);
        assert_eq!(s.ceilings, [4.0]);
    }

    #[test]
    fn test_missing_devices_zero_filled() {
        let s = HistorySeries::build(vec![
            sample(1.0, &[50.0, 50.0], &[1024.0, 2048.0]),
            sample(2.0, &[50.0], &[1024.0]),
        ]);
        assert_eq!(s.gpus.len(), 2);
        assert_eq!(s.gpus[1], [2.0, 0.0]);
        assert_eq!(s.device_names(), ["cuda:0", "cuda:1"]);
        let stacked = s.stacked();
        assert_eq!(stacked[1], [3.0, 1.0]);
    }

    #[test]
    fn test_full_utilization_is_finite() {
        // the 100% sample falls back to the ceiling seen at 50% (2 GiB)
        let s = HistorySeries::build(vec![
            sample(1.0, &[50.0], &[1024.0]),
            sample(2.0, &[100.0], &[0.0]),
            sample(3.0, &[120.0], &[0.0]),
        ]);
        assert_eq!(s.gpus[0], [1.0, 2.0, 2.0]);

        // no valid sample at all: recorded free memory stands in
        let s = HistorySeries::build(vec![sample(1.0, &[100.0], &[512.0])]);
        assert_eq!(s.gpus[0], [0.5]);
        for v in s.gpus.iter().flatten() {
            assert!(v.is_finite() && *v >= 0.0);
        }
        assert!(s.gpu_axis_max().is_finite());
    }

    #[test]
    fn test_short_free_array_reads_as_zero() {
        let s = HistorySeries::build(vec![sample(1.0, &[40.0, 60.0], &[1024.0])]);
        assert_eq!(s.gpus[1], [0.0]);
    }

    #[test]
    fn test_window_covers_whole_days() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
        };
        let (start, end) = range.window();
        let expected_start = Local
            .with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
            .earliest()
            .unwrap()
            .timestamp();
        let expected_end = Local
            .with_ymd_and_hms(2026, 3, 4, 0, 0, 0)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(start, expected_start);
        assert_eq!(end, expected_end);
    }

    #[test]
    fn test_default_range_and_shifts() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut range = DateRange::ending(today);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(range.end, today);

        range.shift_start(10);
        assert_eq!(range.start, today);
        range.shift_end(-3);
        assert_eq!(range.end, today);
        range.shift_end(2);
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 3, 12).unwrap());
    }
}
