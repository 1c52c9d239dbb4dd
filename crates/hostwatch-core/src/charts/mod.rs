//! Chart specifications built from backend records.
//!
//! Everything here is a pure transformation into plain data: pie slices,
//! aligned series and table cells. Drawing them is the caller's business.

pub mod disk;
pub mod history;
pub mod summary;
pub mod users;

pub use disk::{disk_pies, ColorMode, NormMode, PieSlice, PieSpec};
pub use history::{DateRange, HistorySeries};
pub use summary::{summary_table, SummarySort, SummaryTable};
pub use users::{user_gpu_stats, UserGpuStat};
