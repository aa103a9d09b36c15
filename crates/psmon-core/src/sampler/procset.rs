//! Process-set sampler: selected processes plus all their descendants,
//! aggregated into one row per sample.

use std::time::Instant;

use tracing::{debug, warn};

use crate::collector::{CollectError, FileSystem, ProcessCollector, SystemCollector};
use crate::fmt;
use crate::sampler::Sampler;
use crate::sampler::aggregate::{AggregateRecord, CpuTracker, ProcessTree, TreeAggregator};
use crate::sampler::selector::{SelectionCriteria, select_roots};

/// One emitted process-set sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    /// Unix timestamp of the sample, seconds.
    pub timestamp: i64,
    /// Seconds since the sampler started.
    pub uptime: i64,
    pub record: AggregateRecord,
}

impl SampleRow {
    pub fn render(&self) -> String {
        fmt::format_process_row(self)
    }
}

/// Samples a selected group of processes and their descendants.
///
/// Holds everything that must survive between samples (CPU baselines and
/// the start time); the process listing and the visited set are rebuilt
/// on every sample.
pub struct ProcessSetSampler<F: FileSystem + Clone> {
    processes: ProcessCollector<F>,
    system: SystemCollector<F>,
    criteria: SelectionCriteria,
    cpu: CpuTracker,
    start_timestamp: i64,
}

impl<F: FileSystem + Clone> ProcessSetSampler<F> {
    /// Creates a sampler reading from `proc_path` through `fs`.
    pub fn new(
        fs: F,
        proc_path: impl Into<String>,
        criteria: SelectionCriteria,
        start_timestamp: i64,
    ) -> Self {
        let proc_path = proc_path.into();
        Self {
            processes: ProcessCollector::new(fs.clone(), &proc_path),
            system: SystemCollector::new(fs, &proc_path),
            criteria,
            cpu: CpuTracker::new(),
            start_timestamp,
        }
    }

    /// Overrides the page size used for resident memory.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.processes = self.processes.with_page_size(page_size);
        self
    }

    pub fn criteria(&self) -> &SelectionCriteria {
        &self.criteria
    }

    /// Takes one sample stamped with `timestamp`, measuring CPU against `now`.
    pub fn sample_at(&mut self, timestamp: i64, now: Instant) -> Result<SampleRow, CollectError> {
        let listing = self.processes.list_processes()?;
        let roots = select_roots(&self.criteria, &listing);
        let tree = ProcessTree::from_listing(&listing);

        let mem_total_bytes = match self.system.memory_total() {
            Ok(total) => total,
            Err(e) => {
                warn!("memory total unavailable, %MEM reported as 0: {}", e);
                0
            }
        };

        let aggregator = TreeAggregator::new(&self.processes, &tree, mem_total_bytes);
        let (record, visited) = aggregator.aggregate(&roots, &mut self.cpu, now);
        self.cpu.retain_visited(&visited);

        debug!(
            roots = roots.len(),
            visited = visited.len(),
            counted = record.processes,
            "process set sampled"
        );

        Ok(SampleRow {
            timestamp,
            uptime: timestamp - self.start_timestamp,
            record,
        })
    }
}

impl<F: FileSystem + Clone> Sampler for ProcessSetSampler<F> {
    fn header(&self) -> String {
        fmt::process_set_header()
    }

    fn sample(&mut self, timestamp: i64, now: Instant) -> Result<String, CollectError> {
        self.sample_at(timestamp, now).map(|row| row.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MockFs, MockProcess};
    use std::time::Duration;

    const START: i64 = 1_700_000_000;

    fn sampler(fs: MockFs, criteria: SelectionCriteria) -> ProcessSetSampler<MockFs> {
        ProcessSetSampler::new(fs, "/proc", criteria, START).with_page_size(4096)
    }

    fn tree_member(pid: u32) -> MockProcess {
        MockFs::process_tree_members()
            .into_iter()
            .find(|p| p.pid == pid)
            .unwrap()
    }

    #[test]
    fn test_root_by_pid_and_child_by_keyword_counted_once() {
        // 2000 is selected by pid; its child 2003 ("helper") also matches a keyword.
        let criteria = SelectionCriteria::new([2000], ["HELP"]);
        let mut s = sampler(MockFs::process_tree(), criteria);

        let row = s.sample_at(START + 3, Instant::now()).unwrap();

        assert_eq!(row.uptime, 3);
        assert_eq!(row.record.processes, 4);
        assert_eq!(row.record.read_count, 10 + 20 + 30 + 40);
        assert_eq!(row.record.write_count, 5 + 10 + 15 + 20);
    }

    #[test]
    fn test_keyword_roots_with_shared_descendants() {
        // Both workers match, and so does their parent's name through "er".
        let criteria = SelectionCriteria::new([], ["worker", "er"]);
        let mut s = sampler(MockFs::process_tree(), criteria);

        let row = s.sample_at(START, Instant::now()).unwrap();

        // supervisor, worker, worker, helper, Indexer
        assert_eq!(row.record.processes, 5);
        assert_eq!(row.record.read_count, 10 + 20 + 30 + 40 + 1);
    }

    #[test]
    fn test_vanished_mid_walk_contributes_zero() {
        let mut fs = MockFs::process_tree();
        // 2001 is still listed (stat readable) but its status is gone: it
        // exited between the listing and the counter read.
        fs.remove_file("/proc/2001/status");

        let mut s = sampler(fs, SelectionCriteria::new([2000], Vec::<String>::new()));
        let row = s.sample_at(START, Instant::now()).unwrap();

        // 2001 contributes nothing, its child 2003 is still counted.
        assert_eq!(row.record.processes, 3);
        assert_eq!(row.record.read_count, 10 + 30 + 40);
    }

    #[test]
    fn test_permission_denied_treated_as_vanished() {
        let mut fs = MockFs::process_tree();
        fs.deny("/proc/2002/status");

        let mut s = sampler(fs, SelectionCriteria::new([2000], Vec::<String>::new()));
        let row = s.sample_at(START, Instant::now()).unwrap();

        assert_eq!(row.record.read_count, 10 + 20 + 40);
    }

    #[test]
    fn test_denied_io_contributes_nothing() {
        let mut fs = MockFs::process_tree();
        fs.deny("/proc/2001/io");

        let mut s = sampler(fs, SelectionCriteria::new([2001], Vec::<String>::new()));
        let row = s.sample_at(START, Instant::now()).unwrap();

        // Only the child 2003 is counted, with all of its counters.
        assert_eq!(row.record.processes, 1);
        assert_eq!(row.record.rss_bytes, 400 * 4096);
        assert_eq!(row.record.num_threads, 1);
        assert_eq!(row.record.ctx_switches, 40);
        assert_eq!(row.record.read_count, 40);
    }

    #[test]
    fn test_mem_and_units() {
        let mut s = sampler(
            MockFs::process_tree(),
            SelectionCriteria::new([2100], Vec::<String>::new()),
        );
        let row = s.sample_at(START, Instant::now()).unwrap();

        // 50 pages of 4 KiB against MemTotal 16384000 kB
        assert_eq!(row.record.rss_bytes, 50 * 4096);
        let expected = (50.0 * 4096.0) / (16384000.0 * 1024.0) * 100.0;
        assert!((row.record.mem_percent - expected).abs() < 1e-12);

        let line = row.render();
        assert_eq!(line, format!("{}, 0, 1, 0, 1, 0, 200, 2, 1, 0.000, 0.001\n", START));
    }

    #[test]
    fn test_cpu_percent_across_samples() {
        let mut fs = MockFs::process_tree();
        let t0 = Instant::now();

        let mut s = sampler(fs.clone(), SelectionCriteria::new([2100], Vec::<String>::new()));
        let first = s.sample_at(START, t0).unwrap();
        assert_eq!(first.record.cpu_percent, 0.0);

        // 25 more ticks (0.25s CPU) over 1s wall.
        let mut p = tree_member(2100);
        p.utime += 25;
        fs.add_simple_process(&p);
        s.processes = ProcessCollector::new(fs.clone(), "/proc").with_page_size(4096);

        let second = s.sample_at(START + 1, t0 + Duration::from_secs(1)).unwrap();
        assert!((second.record.cpu_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_yields_zero_row() {
        let mut s = sampler(
            MockFs::process_tree(),
            SelectionCriteria::new([], ["nonexistent"]),
        );
        let row = s.sample_at(START + 10, Instant::now()).unwrap();

        assert_eq!(row.record, AggregateRecord::default());
        assert_eq!(
            row.render(),
            format!("{}, 10, 0, 0, 0, 0, 0, 0, 0, 0.000, 0.000\n", START + 10)
        );
    }

    #[test]
    fn test_missing_proc_is_error() {
        let mut s = sampler(MockFs::new(), SelectionCriteria::new([1], Vec::<String>::new()));
        assert!(s.sample_at(START, Instant::now()).is_err());
    }

    #[test]
    fn test_sampler_trait_header_and_row_widths() {
        let mut s = sampler(
            MockFs::process_tree(),
            SelectionCriteria::new([2000], Vec::<String>::new()),
        );
        let header = s.header();
        let row = s.sample(START, Instant::now()).unwrap();
        assert_eq!(
            header.split(fmt::SEPARATOR).count(),
            row.split(fmt::SEPARATOR).count()
        );
    }
}
