//! Delta and percentage helpers for cumulative kernel counters.
//!
//! Every interval value the samplers print is derived here, so counter
//! regressions (device hot-unplug, wraparound, stats reset) are handled in
//! exactly one place.

use crate::collector::DiskCounters;
use crate::collector::procfs::parser::CpuStat;

/// Delta of a monotonic counter; a regression yields 0, never a negative value.
pub fn delta(curr: u64, prev: u64) -> u64 {
    curr.saturating_sub(prev)
}

/// Per-field delta of two disk counter snapshots.
pub fn disk_delta(curr: &DiskCounters, prev: &DiskCounters) -> DiskCounters {
    DiskCounters {
        read_count: delta(curr.read_count, prev.read_count),
        write_count: delta(curr.write_count, prev.write_count),
        read_bytes: delta(curr.read_bytes, prev.read_bytes),
        write_bytes: delta(curr.write_bytes, prev.write_bytes),
        read_time_ms: delta(curr.read_time_ms, prev.read_time_ms),
        write_time_ms: delta(curr.write_time_ms, prev.write_time_ms),
    }
}

/// Busy share of one CPU line between two readings, in percent (0..=100).
///
/// Returns 0 when no jiffies elapsed.
pub fn busy_percent(curr: &CpuStat, prev: &CpuStat) -> f64 {
    let total = delta(curr.total(), prev.total());
    if total == 0 {
        return 0.0;
    }
    let busy = delta(curr.busy(), prev.busy()).min(total);
    busy as f64 / total as f64 * 100.0
}

/// `part / whole` in percent, 0 when `whole` is 0.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
