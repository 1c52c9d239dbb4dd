//! Per-user GPU memory statistics over a history window.

use std::collections::HashMap;

use crate::model::SnapshotRecord;

/// Users at or under both floors are dropped as noise.
const TOTAL_FLOOR_GIB_H: f64 = 0.01;
const PEAK_FLOOR_GIB: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct UserGpuStat {
    pub user: String,
    /// Attributed GPU memory integrated over time, GiB·hours.
    pub total_gib_h: f64,
    /// Largest attributed GPU memory in any single sample, GiB.
    pub peak_gib: f64,
}

/// Integrate `cuda_per_user` over the samples, sorted descending by
/// `total_gib_h`.
///
/// Each sample's attribution is held until the next sample (left rectangle
/// rule); the last sample has no forward interval and adds nothing to the
/// total, though it still counts towards the peak.
pub fn user_gpu_stats(records: &[SnapshotRecord]) -> Vec<UserGpuStat> {
    let mut order: Vec<&SnapshotRecord> = records.iter().collect();
    order.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let mut stats: HashMap<&str, (f64, f64)> = HashMap::new();
    for (i, rec) in order.iter().enumerate() {
        let gap_hours = order
            .get(i + 1)
            .map(|next| (next.timestamp - rec.timestamp).max(0.0) / 3600.0)
            .unwrap_or(0.0);

        let mut per_user: HashMap<&str, f64> = HashMap::new();
        for sample in &rec.cuda_per_user {
            *per_user.entry(sample.user.as_str()).or_insert(0.0) += sample.memory_mib;
        }
        for (user, mib) in per_user {
            let gib = mib / 1024.0;
            let entry = stats.entry(user).or_insert((0.0, 0.0));
            entry.0 += gib * gap_hours;
            entry.1 = entry.1.max(gib);
        }
    }

    let mut out: Vec<UserGpuStat> = stats
        .into_iter()
        .filter(|(_, (total, peak))| !(*total <= TOTAL_FLOOR_GIB_H && *peak <= PEAK_FLOOR_GIB))
        .map(|(user, (total_gib_h, peak_gib))| UserGpuStat {
            user: user.to_string(),
            total_gib_h,
            peak_gib,
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_gib_h
            .total_cmp(&a.total_gib_h)
            .then_with(|| a.user.cmp(&b.user))
    });
    out
}
