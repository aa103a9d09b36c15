//! System collector for gathering machine-wide counters from `/proc/`.

use crate::collector::procfs::parser::{
    CpuStat, MemInfo, parse_diskstats, parse_global_stat, parse_meminfo,
};
use crate::collector::procfs::process::CollectError;
use crate::collector::traits::{DiskUsage, FileSystem};
use std::path::Path;

/// Bytes per sector as reported by `/proc/diskstats`, independent of the device.
const SECTOR_SIZE: u64 = 512;

/// Cumulative block-device counters summed over whole disks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
}

/// Collects system-wide metrics from `/proc/`.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
    sys_block_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            sys_block_path: "/sys/block".to_string(),
        }
    }

    fn read(&self, file: &str) -> Result<String, CollectError> {
        let path = format!("{}/{}", self.proc_path, file);
        Ok(self.fs.read_to_string(Path::new(&path))?)
    }

    /// Collects memory information from `/proc/meminfo` (values in kB).
    pub fn meminfo(&self) -> Result<MemInfo, CollectError> {
        parse_meminfo(&self.read("meminfo")?).map_err(|e| CollectError::Parse(e.message))
    }

    /// Collects CPU time counters from `/proc/stat`.
    ///
    /// The first element is the aggregate line, the rest are per-CPU in file order.
    pub fn cpu_times(&self) -> Result<Vec<CpuStat>, CollectError> {
        let stat = parse_global_stat(&self.read("stat")?)
            .map_err(|e| CollectError::Parse(e.message))?;
        if stat.cpus[0].cpu_id.is_some() {
            return Err(CollectError::Parse(
                "aggregate cpu line missing from stat".to_string(),
            ));
        }
        Ok(stat.cpus)
    }

    /// Sums `/proc/diskstats` over whole storage devices.
    ///
    /// Partitions and other entries without a `/sys/block/<name>` directory
    /// are skipped so their I/O is not counted twice.
    pub fn disk_counters(&self) -> Result<DiskCounters, CollectError> {
        let disks =
            parse_diskstats(&self.read("diskstats")?).map_err(|e| CollectError::Parse(e.message))?;

        let mut total = DiskCounters::default();
        for disk in disks {
            let sys_name = disk.device.replace('/', "!");
            let sys_path = format!("{}/{}", self.sys_block_path, sys_name);
            if !self.fs.exists(Path::new(&sys_path)) {
                continue;
            }
            total.read_count += disk.reads;
            total.write_count += disk.writes;
            total.read_bytes += disk.read_sectors * SECTOR_SIZE;
            total.write_bytes += disk.write_sectors * SECTOR_SIZE;
            total.read_time_ms += disk.read_time;
            total.write_time_ms += disk.write_time;
        }
        Ok(total)
    }

    /// `MemTotal` in bytes.
    pub fn memory_total(&self) -> Result<u64, CollectError> {
        Ok(self.meminfo()?.mem_total * 1024)
    }

    /// Capacity of the filesystem mounted at `mount`.
    pub fn disk_usage(&self, mount: &Path) -> Result<DiskUsage, CollectError> {
        Ok(self.fs.disk_usage(mount)?)
    }

    /// Host name from `/proc/sys/kernel/hostname`.
    pub fn hostname(&self) -> Result<String, CollectError> {
        Ok(self.read("sys/kernel/hostname")?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_memory_total_in_bytes() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        assert_eq!(collector.memory_total().unwrap(), 16384000 * 1024);
    }

    #[test]
    fn test_meminfo() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        let mem = collector.meminfo().unwrap();
        assert_eq!(mem.mem_total, 16384000);
        assert_eq!(mem.swap_free, 3072000);
    }

    #[test]
    fn test_cpu_times() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        let cpus = collector.cpu_times().unwrap();
        assert_eq!(cpus.len(), 5);
        assert_eq!(cpus[0].cpu_id, None);
        assert_eq!(cpus[4].cpu_id, Some(3));
    }

    #[test]
    fn test_disk_counters_skip_partitions() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        let disks = collector.disk_counters().unwrap();

        // sda + nvme0n1; sda1 has no /sys/block entry
        assert_eq!(disks.read_count, 12345 + 50000);
        assert_eq!(disks.write_count, 6789 + 30000);
        assert_eq!(disks.read_bytes, (987654 + 2000000) * 512);
        assert_eq!(disks.write_bytes, (456789 + 1500000) * 512);
        assert_eq!(disks.read_time_ms, 5000 + 10000);
        assert_eq!(disks.write_time_ms, 3000 + 8000);
    }

    #[test]
    fn test_hostname_and_disk_usage() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        assert_eq!(collector.hostname().unwrap(), "testhost");
        let usage = collector.disk_usage(Path::new("/")).unwrap();
        assert_eq!(usage.total, 100 << 30);
    }

    #[test]
    fn test_missing_meminfo_is_error() {
        let collector = SystemCollector::new(MockFs::new(), "/proc");
        assert!(matches!(collector.meminfo(), Err(CollectError::Io(_))));
    }
}
