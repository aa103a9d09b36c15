//! Whole-machine sampler: CPU, memory, swap, disk I/O deltas and root
//! filesystem capacity, one row per sample.

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::collector::procfs::parser::{CpuStat, MemInfo};
use crate::collector::{CollectError, DiskCounters, DiskUsage, FileSystem, SystemCollector};
use crate::fmt;
use crate::rates::{busy_percent, disk_delta, percent_of};
use crate::sampler::Sampler;

/// Cumulative counters from the previous sample, used for interval deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousCounters {
    pub disk: DiskCounters,
    /// Aggregate line first, then one entry per CPU.
    pub cpu: Vec<CpuStat>,
}

/// One emitted whole-machine sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemRow {
    pub timestamp: i64,
    pub uptime: i64,
    pub ncpu: usize,
    /// Busy share of all CPUs, scaled by `ncpu` (0..=100 × ncpu).
    pub cpu_percent: f64,
    pub per_cpu_percent: Vec<f64>,
    pub mem_percent: f64,
    pub mem_total_kb: u64,
    pub mem_used_kb: u64,
    pub mem_available_kb: u64,
    pub mem_free_kb: u64,
    pub swap_percent: f64,
    pub swap_total_kb: u64,
    pub swap_used_kb: u64,
    pub swap_free_kb: u64,
    /// Deltas since the previous sample.
    pub disk: DiskCounters,
    pub disk_usage: DiskUsage,
    pub hostname: String,
}

impl SystemRow {
    pub fn render(&self) -> String {
        fmt::format_system_row(self)
    }
}

/// Memory in use, excluding buffers and reclaimable caches (kB).
fn used_memory_kb(mem: &MemInfo) -> u64 {
    let cached = mem.cached + mem.s_reclaimable;
    let reclaimable = mem.mem_free + mem.buffers + cached;
    if reclaimable <= mem.mem_total {
        mem.mem_total - reclaimable
    } else {
        mem.mem_total.saturating_sub(mem.mem_free)
    }
}

/// The `/proc/stat` line of CPU `id` (`None` for the aggregate line).
fn cpu_line(stats: &[CpuStat], id: Option<u32>) -> Option<&CpuStat> {
    stats.iter().find(|c| c.cpu_id == id)
}

/// Samples machine-wide counters.
pub struct SystemSampler<F: FileSystem> {
    collector: SystemCollector<F>,
    previous: PreviousCounters,
    ncpu: usize,
    mount: PathBuf,
    start_timestamp: i64,
}

impl<F: FileSystem> SystemSampler<F> {
    /// Creates a sampler and records the initial cumulative counters, so the
    /// first row reports zero deltas.
    pub fn new(
        fs: F,
        proc_path: impl Into<String>,
        start_timestamp: i64,
    ) -> Result<Self, CollectError> {
        let collector = SystemCollector::new(fs, proc_path);
        let previous = PreviousCounters {
            disk: collector.disk_counters()?,
            cpu: collector.cpu_times()?,
        };
        let ncpu = previous.cpu.len().saturating_sub(1);
        Ok(Self {
            collector,
            previous,
            ncpu,
            mount: PathBuf::from("/"),
            start_timestamp,
        })
    }

    /// Replaces the previous-sample counters.
    pub fn with_previous(mut self, previous: PreviousCounters) -> Self {
        self.previous = previous;
        self
    }

    /// Reports capacity of the filesystem mounted at `mount` instead of `/`.
    pub fn with_mount(mut self, mount: impl Into<PathBuf>) -> Self {
        self.mount = mount.into();
        self
    }

    pub fn ncpu(&self) -> usize {
        self.ncpu
    }

    pub fn previous(&self) -> &PreviousCounters {
        &self.previous
    }

    /// Takes one sample stamped with `timestamp`.
    ///
    /// `PreviousCounters` is only replaced once every required counter was
    /// read, so a failed sample does not distort the next delta.
    pub fn sample_at(&mut self, timestamp: i64) -> Result<SystemRow, CollectError> {
        let mem = self.collector.meminfo()?;
        let cpu = self.collector.cpu_times()?;
        let disk = self.collector.disk_counters()?;

        let disk_usage = self.collector.disk_usage(&self.mount).unwrap_or_else(|e| {
            debug!("disk usage of {} unavailable: {}", self.mount.display(), e);
            DiskUsage::default()
        });
        let hostname = self.collector.hostname().unwrap_or_else(|e| {
            debug!("hostname unavailable: {}", e);
            "unknown".to_string()
        });

        // An offline CPU has no line and reports 0.
        let busy = |id: Option<u32>| -> f64 {
            match (cpu_line(&cpu, id), cpu_line(&self.previous.cpu, id)) {
                (Some(curr), Some(prev)) => busy_percent(curr, prev),
                _ => 0.0,
            }
        };
        let ncpu = self.ncpu;
        let per_cpu_percent: Vec<f64> = (0..ncpu as u32).map(|i| busy(Some(i))).collect();
        let cpu_percent = busy(None) * ncpu as f64;

        let swap_used_kb = mem.swap_total.saturating_sub(mem.swap_free);
        let row = SystemRow {
            timestamp,
            uptime: timestamp - self.start_timestamp,
            ncpu,
            cpu_percent,
            per_cpu_percent,
            mem_percent: percent_of(mem.mem_total.saturating_sub(mem.mem_available), mem.mem_total),
            mem_total_kb: mem.mem_total,
            mem_used_kb: used_memory_kb(&mem),
            mem_available_kb: mem.mem_available,
            mem_free_kb: mem.mem_free,
            swap_percent: percent_of(swap_used_kb, mem.swap_total),
            swap_total_kb: mem.swap_total,
            swap_used_kb,
            swap_free_kb: mem.swap_free,
            disk: disk_delta(&disk, &self.previous.disk),
            disk_usage,
            hostname,
        };

        self.previous = PreviousCounters { disk, cpu };
        Ok(row)
    }
}

impl<F: FileSystem> Sampler for SystemSampler<F> {
    fn header(&self) -> String {
        fmt::system_header(self.ncpu)
    }

    fn sample(&mut self, timestamp: i64, _now: Instant) -> Result<String, CollectError> {
        self.sample_at(timestamp).map(|row| row.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    const START: i64 = 1_700_000_000;

    #[test]
    fn test_first_row_has_zero_deltas() {
        let mut s = SystemSampler::new(MockFs::typical_system(), "/proc", START).unwrap();
        let row = s.sample_at(START).unwrap();

        assert_eq!(row.ncpu, 4);
        assert_eq!(row.uptime, 0);
        assert_eq!(row.disk, DiskCounters::default());
        assert_eq!(row.cpu_percent, 0.0);
        assert_eq!(row.per_cpu_percent, vec![0.0; 4]);
        assert_eq!(row.hostname, "testhost");
    }

    #[test]
    fn test_disk_delta_against_injected_previous() {
        let mut fs = MockFs::typical_system();
        fs.add_file(
            "/proc/diskstats",
            "   8       0 sda 15 0 8 0 4 0 2 0 0 0 0 0 0 0 0\n",
        );
        let previous = PreviousCounters {
            disk: DiskCounters {
                read_count: 10,
                write_count: 9,
                read_bytes: 2048,
                ..Default::default()
            },
            cpu: Vec::new(),
        };

        let mut s = SystemSampler::new(fs, "/proc", START)
            .unwrap()
            .with_previous(previous);
        let row = s.sample_at(START + 1).unwrap();

        assert_eq!(row.disk.read_count, 5);
        // Counter went backwards (9 -> 4): reported as zero, never negative.
        assert_eq!(row.disk.write_count, 0);
        assert_eq!(row.disk.read_bytes, 8 * 512 - 2048);
        assert_eq!(s.previous().disk.read_count, 15);
    }

    #[test]
    fn test_cpu_percent_scaled_by_ncpu() {
        let mut fs = MockFs::typical_system();
        let mut s = SystemSampler::new(fs.clone(), "/proc", START).unwrap();

        // +300 busy and +700 idle jiffies on the aggregate line, cpu0 fully busy.
        fs.add_file(
            "/proc/stat",
            "\
cpu  10300 500 3000 80700 1000 200 100 0 0 0
cpu0 2600 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20100 250 50 25 0 0 0
cpu2 2500 125 750 20100 250 50 25 0 0 0
cpu3 2500 125 750 20100 250 50 25 0 0 0
",
        );
        s.collector = SystemCollector::new(fs, "/proc");

        let row = s.sample_at(START + 1).unwrap();
        assert!((row.cpu_percent - 120.0).abs() < 1e-9);
        assert_eq!(row.per_cpu_percent, vec![100.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_offline_cpu_does_not_shift_columns() {
        let mut fs = MockFs::typical_system();
        let mut s = SystemSampler::new(fs.clone(), "/proc", START).unwrap();

        // cpu1 went offline; cpu2 is fully busy since the previous sample.
        fs.add_file(
            "/proc/stat",
            "\
cpu  10100 500 3000 80200 1000 200 100 0 0 0
cpu0 2500 125 750 20100 250 50 25 0 0 0
cpu2 2600 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20100 250 50 25 0 0 0
",
        );
        s.collector = SystemCollector::new(fs, "/proc");

        let row = s.sample_at(START + 1).unwrap();
        assert_eq!(row.ncpu, 4);
        assert_eq!(row.per_cpu_percent, vec![0.0, 0.0, 100.0, 0.0]);
    }

    #[test]
    fn test_memory_and_swap() {
        let mut s = SystemSampler::new(MockFs::typical_system(), "/proc", START).unwrap();
        let row = s.sample_at(START).unwrap();

        assert_eq!(row.mem_total_kb, 16384000);
        assert_eq!(row.mem_used_kb, 16384000 - 8192000 - 512000 - 2048000 - 256000);
        assert!((row.mem_percent - 26.7578125).abs() < 1e-9);
        assert_eq!(row.swap_used_kb, 1024000);
        assert!((row.swap_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_row_matches_header() {
        let mut s = SystemSampler::new(MockFs::typical_system(), "/proc", START).unwrap();
        let header = s.header();
        let row = s.sample(START + 2, Instant::now()).unwrap();

        assert_eq!(
            header.split(fmt::SEPARATOR).count(),
            row.split(fmt::SEPARATOR).count()
        );
        assert!(row.ends_with(", 100.000, 40.000, 60.000, testhost\n"));
    }

    #[test]
    fn test_failed_sample_keeps_previous() {
        let mut fs = MockFs::typical_system();
        let mut s = SystemSampler::new(fs.clone(), "/proc", START).unwrap();
        let before = s.previous().clone();

        fs.remove_file("/proc/diskstats");
        s.collector = SystemCollector::new(fs, "/proc");

        assert!(s.sample_at(START + 1).is_err());
        assert_eq!(s.previous(), &before);
    }

    #[test]
    fn test_missing_stat_fails_construction() {
        let mut fs = MockFs::typical_system();
        fs.remove_file("/proc/stat");
        assert!(SystemSampler::new(fs, "/proc", START).is_err());
    }
}
