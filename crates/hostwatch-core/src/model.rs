//! Wire records returned by the metrics backend.
//!
//! Decoding is deliberately lenient: absent or `null` GPU arrays become empty
//! vectors, optional free-capacity fields stay `None`, and per-user GPU
//! attribution accepts both numeric device ids and `"cuda:N"` labels. Other
//! labels, such as `"UNKNOWN"`, keep the sample without a device index.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Name of the synthesized per-host disk that sums all physical disks.
pub const AGGREGATE_DISK: &str = "Total";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================
// Snapshot records
// ============================================================

/// One host's point-in-time resource reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub host: String,
    /// Seconds since epoch.
    pub timestamp: f64,
    /// CPU utilization percent (aggregate, may exceed 100).
    pub cpu: f64,
    /// Free core count.
    #[serde(default)]
    pub cpu_free: Option<f64>,
    /// Memory utilization percent.
    pub memory: f64,
    /// Free memory in MiB.
    #[serde(default)]
    pub memory_free: Option<f64>,
    /// Per-device utilization percent; index is the device id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cuda: Vec<f64>,
    /// Per-device free memory in MiB, aligned with `cuda`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cuda_free: Vec<f64>,
    /// Per-user GPU memory attribution (history only).
    #[serde(default, deserialize_with = "null_as_default")]
    pub cuda_per_user: Vec<GpuUserSample>,
}

impl SnapshotRecord {
    /// Number of GPU devices reported.
    pub fn device_count(&self) -> usize {
        self.cuda.len()
    }

    /// Free MiB on device `i`; positions missing from `cuda_free` read as 0.
    pub fn cuda_free_at(&self, i: usize) -> f64 {
        self.cuda_free.get(i).copied().unwrap_or(0.0)
    }

    /// Mean utilization over all devices, 0 without GPUs.
    pub fn cuda_mean(&self) -> f64 {
        if self.cuda.is_empty() {
            0.0
        } else {
            self.cuda.iter().sum::<f64>() / self.cuda.len() as f64
        }
    }

    /// Total free GPU memory in MiB.
    pub fn cuda_free_total(&self) -> f64 {
        self.cuda_free.iter().sum()
    }
}

/// `(device, user, MiB)` attribution triple.
///
/// The collector reports `"UNKNOWN"` for processes it cannot map to a
/// device; those keep their memory with `device: None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuUserSample {
    pub device: Option<usize>,
    pub user: String,
    pub memory_mib: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDevice {
    Index(u64),
    Label(String),
}

impl RawDevice {
    fn index(&self) -> Option<usize> {
        match self {
            RawDevice::Index(i) => Some(*i as usize),
            RawDevice::Label(label) => label
                .trim()
                .strip_prefix("cuda:")
                .unwrap_or(label.trim())
                .parse()
                .ok(),
        }
    }
}

impl<'de> Deserialize<'de> for GpuUserSample {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (device, user, memory_mib) = <(RawDevice, String, f64)>::deserialize(deserializer)?;
        Ok(GpuUserSample {
            device: device.index(),
            user,
            memory_mib,
        })
    }
}

// ============================================================
// Disk records
// ============================================================

/// One physical disk of a host, sizes in GB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub disk: String,
    pub total: f64,
    pub free: f64,
    /// Username → GB consumed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: BTreeMap<String, f64>,
    /// When the disk was measured (epoch seconds).
    #[serde(default)]
    pub time: Option<f64>,
}

impl DiskRecord {
    /// Synthesize the `"Total"` disk: totals and frees summed, usage summed per user.
    pub fn aggregate(disks: &[DiskRecord]) -> DiskRecord {
        let mut total = DiskRecord {
            disk: AGGREGATE_DISK.to_string(),
            total: 0.0,
            free: 0.0,
            usage: BTreeMap::new(),
            time: disks.first().and_then(|d| d.time),
        };
        for d in disks {
            total.total += d.total;
            total.free += d.free;
            for (user, size) in &d.usage {
                *total.usage.entry(user.clone()).or_insert(0.0) += size;
            }
        }
        total
    }

    /// Prepend the aggregate disk to a host's physical disks.
    pub fn with_aggregate(disks: Vec<DiskRecord>) -> Vec<DiskRecord> {
        let mut out = Vec::with_capacity(disks.len() + 1);
        out.push(DiskRecord::aggregate(&disks));
        out.extend(disks);
        out
    }
}

// ============================================================
// Per-user summary records
// ============================================================

/// One user's current usage on a host (`/api/summary`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummaryRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(default)]
    pub timestamp: f64,
    /// CPU percent; values above 100 span several cores.
    #[serde(default)]
    pub cpu: f64,
    /// Memory percent.
    #[serde(default)]
    pub memory: f64,
    /// Per-device MiB attributed to this user.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cuda: Vec<f64>,
}

impl UserSummaryRecord {
    /// Total attributed GPU memory in MiB.
    pub fn cuda_total(&self) -> f64 {
        self.cuda.iter().sum()
    }
}
