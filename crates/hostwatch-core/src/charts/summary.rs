//! Per-host user summary tables.
//!
//! Each table has one column per active user and one row per resource.

use std::fmt;

use crate::model::UserSummaryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummarySort {
    /// Keep the backend's order.
    #[default]
    Unsorted,
    Cpu,
    Memory,
    Gpu,
}

impl SummarySort {
    pub fn cycle(self) -> Self {
        match self {
            SummarySort::Unsorted => SummarySort::Cpu,
            SummarySort::Cpu => SummarySort::Memory,
            SummarySort::Memory => SummarySort::Gpu,
            SummarySort::Gpu => SummarySort::Unsorted,
        }
    }
}

impl fmt::Display for SummarySort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SummarySort::Unsorted => "unsorted",
            SummarySort::Cpu => "by CPU",
            SummarySort::Memory => "by memory",
            SummarySort::Gpu => "by GPU",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryTable {
    /// Column headers after the leading `"User"` cell.
    pub users: Vec<String>,
    /// `(row label, cells)` for CPU, MEM and GPU.
    pub rows: Vec<(&'static str, Vec<String>)>,
    /// Timestamp of the first record, if any.
    pub timestamp: Option<f64>,
}

pub fn cpu_cell(cpu: f64) -> String {
    if cpu > 100.0 {
        format!("{:.1} Cores", cpu / 100.0)
    } else if cpu > 0.0 {
        format!("{:.1}%", cpu)
    } else {
        "-".to_string()
    }
}

pub fn memory_cell(memory: f64) -> String {
    if memory > 0.0 {
        format!("{:.1}%", memory)
    } else {
        "-".to_string()
    }
}

pub fn gpu_cell(cuda_mib: f64) -> String {
    let gib = cuda_mib / 1024.0;
    if gib > 0.0 {
        format!("{:.1} GiB", gib)
    } else {
        "-".to_string()
    }
}

fn is_active(rec: &UserSummaryRecord) -> bool {
    rec.cpu > 0.0 || rec.memory > 0.0 || rec.cuda.iter().any(|m| *m > 0.0)
}

/// Build a host's table: idle users dropped, the rest sorted by `sort`.
pub fn summary_table(records: &[UserSummaryRecord], sort: SummarySort) -> SummaryTable {
    let timestamp = records.first().map(|r| r.timestamp);
    let mut active: Vec<&UserSummaryRecord> = records.iter().filter(|r| is_active(r)).collect();
    match sort {
        SummarySort::Unsorted => {}
        SummarySort::Cpu => active.sort_by(|a, b| b.cpu.total_cmp(&a.cpu)),
        SummarySort::Memory => active.sort_by(|a, b| b.memory.total_cmp(&a.memory)),
        SummarySort::Gpu => active.sort_by(|a, b| b.cuda_total().total_cmp(&a.cuda_total())),
    }

    SummaryTable {
        users: active.iter().map(|r| r.user.clone()).collect(),
        rows: vec![
            ("CPU", active.iter().map(|r| cpu_cell(r.cpu)).collect()),
            ("MEM", active.iter().map(|r| memory_cell(r.memory)).collect()),
            ("GPU", active.iter().map(|r| gpu_cell(r.cuda_total())).collect()),
        ],
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(user: &str, cpu: f64, memory: f64, cuda: &[f64]) -> UserSummaryRecord {
        UserSummaryRecord {
            user: user.to_string(),
            timestamp: 1_700_000_000.0,
            cpu,
            memory,
            cuda: cuda.to_vec(),
        }
    }

    #[test]
    fn test_cells() {
        assert_eq!(cpu_cell(250.0), "2.5 Cores");
        assert_eq!(cpu_cell(100.0), "100.0%");
        assert_eq!(cpu_cell(12.34), "12.3%");
        assert_eq!(cpu_cell(0.0), "-");
        assert_eq!(memory_cell(3.26), "3.3%");
        assert_eq!(memory_cell(0.0), "-");
        assert_eq!(gpu_cell(1536.0), "1.5 GiB");
        assert_eq!(gpu_cell(0.0), "-");
    }

    #[test]
    fn test_idle_users_dropped() {
        let table = summary_table(
            &[
                rec("idle", 0.0, 0.0, &[0.0, 0.0]),
                rec("alice", 0.0, 0.0, &[0.0, 512.0]),
                rec("bob", 10.0, 0.0, &[]),
            ],
            SummarySort::Unsorted,
        );
        assert_eq!(table.users, ["alice", "bob"]);
        assert_eq!(table.rows[2], ("GPU", vec!["0.5 GiB".to_string(), "-".to_string()]));
        assert_eq!(table.timestamp, Some(1_700_000_000.0));
    }

    #[test]
    fn test_sorting() {
        let records = [
            rec("a", 10.0, 30.0, &[1024.0]),
            rec("b", 300.0, 10.0, &[]),
            rec("c", 50.0, 20.0, &[2048.0, 2048.0]),
        ];
        let users = |s| summary_table(&records, s).users;
        assert_eq!(users(SummarySort::Unsorted), ["a", "b", "c"]);
        assert_eq!(users(SummarySort::Cpu), ["b", "c", "a"]);
        assert_eq!(users(SummarySort::Memory), ["a", "c", "b"]);
        assert_eq!(users(SummarySort::Gpu), ["c", "a", "b"]);
    }

    #[test]
    fn test_sort_cycles_back() {
        let mut s = SummarySort::default();
        for _ in 0..4 {
            s = s.cycle();
        }
        assert_eq!(s, SummarySort::Unsorted);
    }
}
