//! Process-tree traversal and counter aggregation.
//!
//! Each sample walks every root and its live descendants once, summing the
//! counters of every distinct pid into a single [`AggregateRecord`].

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, warn};

use crate::collector::{CLK_TCK, CounterReader, ProcessCounters, ProcessEntry};
use crate::rates::{delta, percent_of};

/// Pids already aggregated in the current sample.
pub type VisitedSet = HashSet<u32>;

/// Summed counters of one sample. Created fresh per sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateRecord {
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub rss_bytes: u64,
    pub mem_percent: f64,
    pub cpu_percent: f64,
    pub num_threads: u64,
    pub ctx_switches: u64,
    /// Processes whose counters were read successfully.
    pub processes: usize,
}

impl AggregateRecord {
    fn add(&mut self, c: &ProcessCounters, cpu_percent: f64, mem_percent: f64) {
        self.read_count += c.read_count;
        self.write_count += c.write_count;
        self.read_bytes += c.read_bytes;
        self.write_bytes += c.write_bytes;
        self.rss_bytes += c.rss_bytes;
        self.mem_percent += mem_percent;
        self.cpu_percent += cpu_percent;
        self.num_threads += c.num_threads;
        self.ctx_switches += c.ctx_switches;
        self.processes += 1;
    }
}

#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    start_ticks: u64,
    cpu_ticks: u64,
    at: Instant,
}

/// Per-process CPU baselines carried from one sample to the next.
///
/// A process reports 0% on the sample it is first seen in (or after its pid
/// was reused), and the busy share of one CPU since the previous sample
/// afterwards, so multi-threaded processes can exceed 100%.
#[derive(Debug, Default)]
pub struct CpuTracker {
    baselines: HashMap<u32, CpuBaseline>,
}

impl CpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// CPU percent of `pid` since its previous observation, updating the baseline.
    pub fn observe(&mut self, pid: u32, counters: &ProcessCounters, now: Instant) -> f64 {
        let current = CpuBaseline {
            start_ticks: counters.start_ticks,
            cpu_ticks: counters.cpu_ticks,
            at: now,
        };
        let Some(prev) = self.baselines.insert(pid, current) else {
            return 0.0;
        };
        if prev.start_ticks != counters.start_ticks {
            return 0.0;
        }

        let wall = now.saturating_duration_since(prev.at).as_secs_f64();
        if wall <= 0.0 {
            return 0.0;
        }
        let cpu_secs = delta(counters.cpu_ticks, prev.cpu_ticks) as f64 / CLK_TCK as f64;
        cpu_secs / wall * 100.0
    }

    /// Drops baselines of processes not seen in the latest sample.
    pub fn retain_visited(&mut self, visited: &VisitedSet) {
        self.baselines.retain(|pid, _| visited.contains(pid));
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

/// Parent → children index built from one live-process listing.
#[derive(Debug, Default)]
pub struct ProcessTree {
    children: HashMap<u32, Vec<u32>>,
}

impl ProcessTree {
    pub fn from_listing(listing: &[ProcessEntry]) -> Self {
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for entry in listing {
            if entry.pid != entry.ppid {
                children.entry(entry.ppid).or_default().push(entry.pid);
            }
        }
        Self { children }
    }

    pub fn children(&self, pid: u32) -> &[u32] {
        self.children.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Walks process trees and sums their counters.
pub struct TreeAggregator<'a, R: CounterReader> {
    reader: &'a R,
    tree: &'a ProcessTree,
    /// MemTotal in bytes; 0 makes every memory percentage 0.
    mem_total_bytes: u64,
}

impl<'a, R: CounterReader> TreeAggregator<'a, R> {
    pub fn new(reader: &'a R, tree: &'a ProcessTree, mem_total_bytes: u64) -> Self {
        Self {
            reader,
            tree,
            mem_total_bytes,
        }
    }

    /// Aggregates every root and all of its descendants.
    ///
    /// Uses an explicit worklist; a pid enters the visited set when it is
    /// first queued, so it is counted at most once no matter how many roots
    /// reach it. A process that vanished or denies access contributes zero,
    /// and its listed children are still walked.
    pub fn aggregate(
        &self,
        roots: &[u32],
        cpu: &mut CpuTracker,
        now: Instant,
    ) -> (AggregateRecord, VisitedSet) {
        let mut record = AggregateRecord::default();
        let mut visited = VisitedSet::new();
        let mut stack: Vec<u32> = Vec::new();

        for &root in roots {
            if !visited.insert(root) {
                continue;
            }
            stack.push(root);

            while let Some(pid) = stack.pop() {
                match self.reader.read_counters(pid) {
                    Ok(counters) => {
                        let cpu_percent = cpu.observe(pid, &counters, now);
                        let mem_percent = percent_of(counters.rss_bytes, self.mem_total_bytes);
                        record.add(&counters, cpu_percent, mem_percent);
                    }
                    Err(e) if e.is_transient() => {
                        debug!(pid, "no contribution: {}", e);
                    }
                    Err(e) => {
                        warn!(pid, "failed to read counters: {}", e);
                    }
                }

                for &child in self.tree.children(pid) {
                    if visited.insert(child) {
                        stack.push(child);
                    }
                }
            }
        }

        (record, visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectError, MockFs, ProcessCollector};
    use std::time::Duration;

    fn entry(pid: u32, ppid: u32) -> ProcessEntry {
        ProcessEntry {
            pid,
            ppid,
            name: format!("p{}", pid),
        }
    }

    /// Reader backed by a map; absent pids behave as exited.
    struct MapReader(HashMap<u32, ProcessCounters>);

    impl CounterReader for MapReader {
        fn read_counters(&self, pid: u32) -> Result<ProcessCounters, CollectError> {
            self.0
                .get(&pid)
                .copied()
                .ok_or(CollectError::ProcessGone(pid))
        }
    }

    fn counters(read_count: u64) -> ProcessCounters {
        ProcessCounters {
            read_count,
            num_threads: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_child_reached_twice_counted_once() {
        // Root 10 selected by pid; its child 11 also selected by keyword.
        let listing = vec![entry(10, 1), entry(11, 10)];
        let tree = ProcessTree::from_listing(&listing);
        let reader = MapReader(HashMap::from([(10, counters(100)), (11, counters(7))]));

        let agg = TreeAggregator::new(&reader, &tree, 0);
        let (record, visited) = agg.aggregate(&[10, 11], &mut CpuTracker::new(), Instant::now());

        assert_eq!(record.read_count, 107);
        assert_eq!(record.num_threads, 2);
        assert_eq!(record.processes, 2);
        assert_eq!(visited.len(), 2);

        // Same result whichever root is walked first.
        let (reversed, _) = agg.aggregate(&[11, 10], &mut CpuTracker::new(), Instant::now());
        assert_eq!(reversed.read_count, 107);
    }

    #[test]
    fn test_vanished_process_contributes_zero_and_walk_continues() {
        // 20 -> 21 (gone) -> 22, and 20 -> 23
        let listing = vec![entry(20, 1), entry(21, 20), entry(22, 21), entry(23, 20)];
        let tree = ProcessTree::from_listing(&listing);
        let reader = MapReader(HashMap::from([
            (20, counters(1)),
            (22, counters(100)),
            (23, counters(1000)),
        ]));

        let agg = TreeAggregator::new(&reader, &tree, 0);
        let (record, visited) = agg.aggregate(&[20], &mut CpuTracker::new(), Instant::now());

        assert_eq!(record.read_count, 1101);
        assert_eq!(record.processes, 3);
        assert!(visited.contains(&21));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let depth = 50_000u32;
        let listing: Vec<ProcessEntry> = (1..=depth).map(|pid| entry(pid, pid - 1)).collect();
        let tree = ProcessTree::from_listing(&listing);
        let reader = MapReader((1..=depth).map(|pid| (pid, counters(1))).collect());

        let agg = TreeAggregator::new(&reader, &tree, 0);
        let (record, _) = agg.aggregate(&[1], &mut CpuTracker::new(), Instant::now());

        assert_eq!(record.read_count, depth as u64);
    }

    #[test]
    fn test_self_parented_entry_terminates() {
        let listing = vec![entry(0, 0), entry(5, 0)];
        let tree = ProcessTree::from_listing(&listing);
        assert_eq!(tree.children(0), &[5]);
        assert!(tree.children(5).is_empty());
    }

    #[test]
    fn test_mem_percent_sums_per_process() {
        let listing = vec![entry(1, 0), entry(2, 1)];
        let tree = ProcessTree::from_listing(&listing);
        let reader = MapReader(HashMap::from([
            (
                1,
                ProcessCounters {
                    rss_bytes: 250,
                    ..Default::default()
                },
            ),
            (
                2,
                ProcessCounters {
                    rss_bytes: 250,
                    ..Default::default()
                },
            ),
        ]));

        let agg = TreeAggregator::new(&reader, &tree, 1000);
        let (record, _) = agg.aggregate(&[1], &mut CpuTracker::new(), Instant::now());

        assert_eq!(record.rss_bytes, 500);
        assert!((record.mem_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_tracker_first_observation_is_zero() {
        let mut cpu = CpuTracker::new();
        let t0 = Instant::now();
        let mut c = ProcessCounters {
            cpu_ticks: 100,
            start_ticks: 5,
            ..Default::default()
        };

        assert_eq!(cpu.observe(7, &c, t0), 0.0);

        // 50 ticks = 0.5s of CPU over 1s of wall time
        c.cpu_ticks = 150;
        let pct = cpu.observe(7, &c, t0 + Duration::from_secs(1));
        assert!((pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_tracker_pid_reuse_resets_baseline() {
        let mut cpu = CpuTracker::new();
        let t0 = Instant::now();
        let old = ProcessCounters {
            cpu_ticks: 100,
            start_ticks: 5,
            ..Default::default()
        };
        let reused = ProcessCounters {
            cpu_ticks: 300,
            start_ticks: 9000,
            ..Default::default()
        };

        cpu.observe(7, &old, t0);
        assert_eq!(cpu.observe(7, &reused, t0 + Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_cpu_tracker_retain_visited() {
        let mut cpu = CpuTracker::new();
        let now = Instant::now();
        cpu.observe(1, &ProcessCounters::default(), now);
        cpu.observe(2, &ProcessCounters::default(), now);

        cpu.retain_visited(&VisitedSet::from([2]));

        assert_eq!(cpu.len(), 1);
    }

    #[test]
    fn test_aggregate_mock_tree() {
        let fs = MockFs::process_tree();
        let collector = ProcessCollector::new(fs, "/proc").with_page_size(4096);
        let listing = collector.list_processes().unwrap();
        let tree = ProcessTree::from_listing(&listing);

        let agg = TreeAggregator::new(&collector, &tree, 0);
        let (record, visited) = agg.aggregate(&[2000], &mut CpuTracker::new(), Instant::now());

        let mut expected: VisitedSet = [2000, 2001, 2002, 2003].into();
        assert_eq!(visited, expected);
        assert_eq!(record.read_count, 10 + 20 + 30 + 40);
        assert_eq!(record.rss_bytes, (100 + 200 + 300 + 400) * 4096);
        assert_eq!(record.ctx_switches, 10 + 20 + 30 + 40);
        assert_eq!(record.num_threads, 2 + 4 + 1 + 1);

        expected.insert(2100);
        let (_, visited) = agg.aggregate(&[2000, 2100], &mut CpuTracker::new(), Instant::now());
        assert_eq!(visited, expected);
    }
}
