//! Per-host disk usage pies.
//!
//! One pie per disk, the synthesized `"Total"` disk first. Slices are users
//! sorted by size plus a trailing `"Free"` slice; how much of the circle a
//! pie sweeps depends on the [`NormMode`].

use std::fmt;

use crate::color::{color_interpolate, Rgb};
use crate::fmt::format_gb;
use crate::model::DiskRecord;

/// Angle (degrees, counter-clockwise from 3 o'clock) where every pie starts.
pub const START_ANGLE: f64 = 135.0;

/// Slices spanning less than this fraction of a full circle get no label.
pub const LABEL_MIN_CIRCLE_SHARE: f64 = 0.05;

/// Share of the reference size at which a user's slice turns red.
const RED_SHARE: f64 = 0.2;

/// What a user's slice colour is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// 20% of the disk the slice is on.
    #[default]
    ByDisk,
    /// 20% of the host's mean physical disk size.
    ByFleetMean,
}

impl ColorMode {
    pub fn toggle(self) -> Self {
        match self {
            ColorMode::ByDisk => ColorMode::ByFleetMean,
            ColorMode::ByFleetMean => ColorMode::ByDisk,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorMode::ByDisk => "colour by disk",
            ColorMode::ByFleetMean => "colour by mean disk",
        })
    }
}

/// How much of the circle each pie sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormMode {
    /// Every pie is a full circle.
    #[default]
    ByDisk,
    /// Relative to the host's largest physical disk.
    ByFleetMax,
    /// Relative to the host's total capacity.
    ByFleetTotal,
}

impl NormMode {
    pub fn cycle(self) -> Self {
        match self {
            NormMode::ByDisk => NormMode::ByFleetMax,
            NormMode::ByFleetMax => NormMode::ByFleetTotal,
            NormMode::ByFleetTotal => NormMode::ByDisk,
        }
    }
}

impl fmt::Display for NormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NormMode::ByDisk => "full circle",
            NormMode::ByFleetMax => "relative to largest disk",
            NormMode::ByFleetTotal => "relative to total",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub name: String,
    /// GB.
    pub value: f64,
    pub colour: Rgb,
    /// Fraction of this pie, 0..=1.
    pub share: f64,
    pub show_label: bool,
}

impl PieSlice {
    /// `"alice 40GB (26.7%)"`.
    pub fn tooltip(&self) -> String {
        format!(
            "{} {} ({:.1}%)",
            self.name,
            format_gb(self.value),
            self.share * 100.0
        )
    }

    pub fn label(&self) -> Option<String> {
        self.show_label.then(|| self.tooltip())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSpec {
    /// Disk name.
    pub title: String,
    /// `"{free} Free"`.
    pub subtitle: String,
    pub slices: Vec<PieSlice>,
    pub start_angle: f64,
    /// Degrees swept clockwise from `start_angle`.
    pub sweep: f64,
}

impl PieSpec {
    /// `(start, span)` in degrees for every slice, walking clockwise so each
    /// span is negative.
    pub fn arcs(&self) -> Vec<(f64, f64)> {
        let mut at = self.start_angle;
        self.slices
            .iter()
            .map(|s| {
                let span = -s.share * self.sweep;
                let arc = (at, span);
                at += span;
                arc
            })
            .collect()
    }
}

fn sweep_for(index: usize, disk: &DiskRecord, aggregate: &DiskRecord, max: f64, norm: NormMode) -> f64 {
    let ratio = match norm {
        NormMode::ByDisk => return 360.0,
        NormMode::ByFleetMax if index == 0 => return 360.0,
        NormMode::ByFleetMax => disk.total / max,
        NormMode::ByFleetTotal => disk.total / aggregate.total,
    };
    if ratio.is_finite() {
        ratio.max(0.0) * 360.0
    } else {
        360.0
    }
}

/// Build the pies for one host from its physical disks.
pub fn disk_pies(physical: &[DiskRecord], colour: ColorMode, norm: NormMode) -> Vec<PieSpec> {
    let disks = DiskRecord::with_aggregate(physical.to_vec());
    let aggregate = &disks[0];
    let max_physical = physical.iter().map(|d| d.total).fold(f64::NEG_INFINITY, f64::max);
    let fleet_threshold = if physical.is_empty() {
        None
    } else {
        Some(RED_SHARE * aggregate.total / physical.len() as f64)
    };

    disks
        .iter()
        .enumerate()
        .map(|(index, disk)| {
            let threshold = match (colour, fleet_threshold) {
                (ColorMode::ByFleetMean, Some(t)) => t,
                _ => RED_SHARE * disk.total,
            };
            let sweep = sweep_for(index, disk, aggregate, max_physical, norm);
            PieSpec {
                title: disk.disk.clone(),
                subtitle: format!("{} Free", format_gb(disk.free)),
                slices: slices(disk, threshold, sweep),
                start_angle: START_ANGLE,
                sweep,
            }
        })
        .collect()
}

fn slices(disk: &DiskRecord, threshold: f64, sweep: f64) -> Vec<PieSlice> {
    let mut users: Vec<(&String, f64)> = disk.usage.iter().map(|(u, v)| (u, *v)).collect();
    users.sort_by(|a, b| b.1.total_cmp(&a.1));

    let sum: f64 = users.iter().map(|(_, v)| v.max(0.0)).sum::<f64>() + disk.free.max(0.0);
    let share = |v: f64| if sum > 0.0 { v.max(0.0) / sum } else { 0.0 };
    let visible = |share: f64| share * sweep >= 360.0 * LABEL_MIN_CIRCLE_SHARE;

    let mut out: Vec<PieSlice> = users
        .into_iter()
        .map(|(name, value)| PieSlice {
            name: name.clone(),
            value,
            colour: color_interpolate(value, threshold),
            share: share(value),
            show_label: visible(share(value)),
        })
        .collect();
    out.push(PieSlice {
        name: "Free".to_string(),
        value: disk.free,
        colour: Rgb::FREE,
        share: share(disk.free),
        show_label: visible(share(disk.free)),
    });
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn disk(name: &str, total: f64, free: f64, usage: &[(&str, f64)]) -> DiskRecord {
        DiskRecord {
            disk: name.to_string(),
            total,
            free,
            usage: usage.iter().map(|(u, v)| (u.to_string(), *v)).collect::<BTreeMap<_, _>>(),
            time: None,
        }
    }

    fn host() -> Vec<DiskRecord> {
        vec![
            disk("sda", 100.0, 10.0, &[("alice", 40.0)]),
            disk("sdb", 50.0, 5.0, &[("alice", 20.0), ("bob", 15.0)]),
        ]
    }

    #[test]
    fn test_total_first_then_physical() {
        let pies = disk_pies(&host(), ColorMode::ByDisk, NormMode::ByDisk);
        let titles: Vec<&str> = pies.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Total", "sda", "sdb"]);
        assert_eq!(pies[0].subtitle, "15GB Free");
        assert!(pies.iter().all(|p| p.start_angle == START_ANGLE));
    }

    #[test]
    fn test_slices_sorted_with_free_last() {
        let pies = disk_pies(&host(), ColorMode::ByDisk, NormMode::ByDisk);
        let names: Vec<&str> = pies[2].slices.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "Free"]);
        let free = pies[2].slices.last().unwrap();
        assert_eq!(free.colour, Rgb::FREE);
        let total: f64 = pies[2].slices.iter().map(|s| s.share).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_colour_modes() {
        // sdb: alice 20GB against 20% of 50GB = 10GB -> red
        let by_disk = disk_pies(&host(), ColorMode::ByDisk, NormMode::ByDisk);
        assert_eq!(by_disk[2].slices[0].colour, Rgb::HOT);
        // against 20% of the mean disk (75GB) = 15GB -> still red; bob 15GB hits it exactly
        let by_mean = disk_pies(&host(), ColorMode::ByFleetMean, NormMode::ByDisk);
        assert_eq!(by_mean[2].slices[1].colour, Rgb::HOT);
        // sda: alice 40GB vs 20GB (by disk) red; bob absent
        assert_eq!(by_disk[1].slices[0].colour, Rgb::HOT);
        // on the Total disk by disk, threshold is 30GB: bob 15GB is not red
        assert_ne!(by_disk[0].slices[1].colour, Rgb::HOT);
    }

    #[test]
    fn test_sweep_modes() {
        let full = disk_pies(&host(), ColorMode::ByDisk, NormMode::ByDisk);
        assert!(full.iter().all(|p| p.sweep == 360.0));

        let by_max = disk_pies(&host(), ColorMode::ByDisk, NormMode::ByFleetMax);
        let sweeps: Vec<f64> = by_max.iter().map(|p| p.sweep).collect();
        assert_eq!(sweeps, [360.0, 360.0, 180.0]);

        let by_total = disk_pies(&host(), ColorMode::ByDisk, NormMode::ByFleetTotal);
        let sweeps: Vec<f64> = by_total.iter().map(|p| p.sweep).collect();
        assert_eq!(sweeps, [360.0, 240.0, 120.0]);
    }

    #[test]
    fn test_zero_capacity_does_not_produce_nan() {
        let disks = vec![disk("empty", 0.0, 0.0, &[])];
        for norm in [NormMode::ByDisk, NormMode::ByFleetMax, NormMode::ByFleetTotal] {
            for pie in disk_pies(&disks, ColorMode::ByFleetMean, norm) {
                assert!(pie.sweep.is_finite());
                assert!(pie.slices.iter().all(|s| s.share.is_finite()));
            }
        }
        let nothing = disk_pies(&[], ColorMode::ByFleetMean, NormMode::ByFleetMax);
        assert_eq!(nothing.len(), 1);
    }

    #[test]
    fn test_small_slices_lose_labels() {
        let disks = vec![disk("sda", 1000.0, 900.0, &[("alice", 60.0), ("bob", 40.0)])];
        let pies = disk_pies(&disks, ColorMode::ByDisk, NormMode::ByDisk);
        let sda = &pies[1];
        // alice 6%, bob 4%
        assert!(sda.slices[0].show_label);
        assert!(!sda.slices[1].show_label);
        assert_eq!(sda.slices[1].label(), None);
        assert_eq!(sda.slices[1].tooltip(), "bob 40GB (4.0%)");

        // half-circle pie: alice's 6% only spans 3% of the circle
        let disks = vec![
            disk("big", 2000.0, 2000.0, &[]),
            disk("sda", 1000.0, 900.0, &[("alice", 60.0), ("bob", 40.0)]),
        ];
        let pies = disk_pies(&disks, ColorMode::ByDisk, NormMode::ByFleetMax);
        assert!(!pies[2].slices[0].show_label);
    }

    #[test]
    fn test_arcs_walk_clockwise() {
        let pies = disk_pies(&host(), ColorMode::ByDisk, NormMode::ByFleetTotal);
        let arcs = pies[2].arcs();
        assert_eq!(arcs[0].0, START_ANGLE);
        let swept: f64 = arcs.iter().map(|(_, span)| -span).sum();
        assert!((swept - 120.0).abs() < 1e-9);
        assert!(arcs.windows(2).all(|w| w[1].0 < w[0].0 || w[0].1 == 0.0));
    }
}
