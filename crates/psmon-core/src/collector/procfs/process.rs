//! Process collector for gathering per-process counters from `/proc/[pid]/`.

use crate::collector::procfs::parser::{parse_proc_io, parse_proc_stat, parse_proc_status};
use crate::collector::traits::FileSystem;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Clock ticks per second (USER_HZ). Standard value for Linux.
pub const CLK_TCK: u64 = 100;

/// Longest name the kernel keeps in `comm` (TASK_COMM_LEN - 1).
const COMM_MAX_LEN: usize = 15;

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// Process disappeared during collection.
    ProcessGone(u32),
    /// Counters of the process are not readable by this user.
    PermissionDenied(u32),
    /// I/O error reading `/proc` files.
    Io(io::Error),
    /// Parse error in `/proc` files.
    Parse(String),
}

impl CollectError {
    /// Returns true for failures caused by the process itself (exit or
    /// access rules) rather than by the collector.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CollectError::ProcessGone(_) | CollectError::PermissionDenied(_)
        )
    }

    fn from_read(pid: u32, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => CollectError::PermissionDenied(pid),
            io::ErrorKind::NotFound => CollectError::ProcessGone(pid),
            _ if e.raw_os_error() == Some(libc::ESRCH) => CollectError::ProcessGone(pid),
            _ => CollectError::Io(e),
        }
    }
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            CollectError::PermissionDenied(pid) => {
                write!(f, "permission denied reading process {}", pid)
            }
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CollectError {
    fn from(e: io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// One row of the live-process listing taken at the start of a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
}

/// Point-in-time counters of a single process.
///
/// Every field is always present; counters the kernel does not expose
/// to us are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessCounters {
    /// Read syscalls (`syscr`).
    pub read_count: u64,
    /// Write syscalls (`syscw`).
    pub write_count: u64,
    /// Bytes fetched from storage.
    pub read_bytes: u64,
    /// Bytes sent to storage.
    pub write_bytes: u64,
    /// Resident set size in bytes.
    pub rss_bytes: u64,
    /// utime + stime, in clock ticks.
    pub cpu_ticks: u64,
    /// Start time after boot, in clock ticks. Distinguishes reused pids.
    pub start_ticks: u64,
    pub num_threads: u64,
    /// Voluntary + involuntary context switches.
    pub ctx_switches: u64,
}

/// Source of per-process counters, keyed by pid.
pub trait CounterReader {
    fn read_counters(&self, pid: u32) -> Result<ProcessCounters, CollectError>;
}

/// Collects process information from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
    page_size: u64,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            page_size: system_page_size(),
        }
    }

    /// Overrides the page size used to convert `rss` pages to bytes.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    fn read(&self, pid: u32, file: &str) -> Result<String, CollectError> {
        let path = format!("{}/{}/{}", self.proc_path, pid, file);
        self.fs
            .read_to_string(Path::new(&path))
            .map_err(|e| CollectError::from_read(pid, e))
    }

    fn is_alive(&self, pid: u32) -> bool {
        let stat = format!("{}/{}/stat", self.proc_path, pid);
        self.fs.exists(Path::new(&stat))
    }

    /// Resolves the display name of a process.
    ///
    /// `comm` is truncated by the kernel; when it is at the limit, the
    /// basename of the first `cmdline` argument is used if it extends it.
    fn process_name(&self, pid: u32, stat_comm: &str) -> String {
        let comm = self
            .read(pid, "comm")
            .map(|c| c.trim_end_matches('\n').to_string())
            .unwrap_or_else(|_| stat_comm.to_string());

        if comm.len() < COMM_MAX_LEN {
            return comm;
        }

        let extended = self.read(pid, "cmdline").ok().and_then(|cmdline| {
            let exe = cmdline.split('\0').next()?;
            let base = exe.rsplit('/').next()?;
            base.starts_with(&comm).then(|| base.to_string())
        });
        extended.unwrap_or(comm)
    }

    /// Lists all live processes once.
    ///
    /// Processes that disappear between the directory listing and reading
    /// their `stat` are silently skipped. The result is ordered by pid.
    pub fn list_processes(&self) -> Result<Vec<ProcessEntry>, CollectError> {
        let entries = self.fs.read_dir(Path::new(&self.proc_path))?;

        let mut processes = Vec::new();
        for entry in entries {
            let Some(pid) = entry
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };

            let stat = match self
                .read(pid, "stat")
                .and_then(|s| parse_proc_stat(&s).map_err(|e| CollectError::Parse(e.message)))
            {
                Ok(stat) => stat,
                Err(e) if e.is_transient() => {
                    debug!(pid, "skipping process during listing: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!(pid, "failed to list process: {}", e);
                    continue;
                }
            };

            processes.push(ProcessEntry {
                pid,
                ppid: stat.ppid,
                name: self.process_name(pid, &stat.comm),
            });
        }

        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }
}

impl<F: FileSystem> CounterReader for ProcessCollector<F> {
    /// Reads the counters of a single process.
    ///
    /// `/proc/[pid]/io` is optional: when it cannot be read (kernel without
    /// task I/O accounting, or a process owned by another user) the I/O
    /// fields are zero while the remaining counters are still reported.
    fn read_counters(&self, pid: u32) -> Result<ProcessCounters, CollectError> {
        let stat = parse_proc_stat(&self.read(pid, "stat")?)
            .map_err(|e| CollectError::Parse(e.message))?;
        let status = parse_proc_status(&self.read(pid, "status")?)
            .map_err(|e| CollectError::Parse(e.message))?;

        // Without task I/O accounting the file is absent and I/O reads as
        // zero. A denied read, or a process gone by now, contributes nothing.
        let io = match self.read(pid, "io") {
            Ok(content) => parse_proc_io(&content).unwrap_or_default(),
            Err(CollectError::ProcessGone(_)) if self.is_alive(pid) => {
                debug!(pid, "I/O counters not provided by kernel");
                Default::default()
            }
            Err(e) => return Err(e),
        };

        Ok(ProcessCounters {
            read_count: io.syscr,
            write_count: io.syscw,
            read_bytes: io.read_bytes,
            write_bytes: io.write_bytes,
            rss_bytes: (stat.rss.max(0) as u64) * self.page_size,
            cpu_ticks: stat.utime + stat.stime,
            start_ticks: stat.starttime,
            num_threads: stat.num_threads.max(0) as u64,
            ctx_switches: status.voluntary_ctxt_switches + status.nonvoluntary_ctxt_switches,
        })
    }
}

/// Page size of the running kernel, 4096 if it cannot be determined.
fn system_page_size() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as u64 } else { 4096 }
}
