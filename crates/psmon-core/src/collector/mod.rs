//! OS counter collection for Linux.
//!
//! This module is the boundary between the samplers and the kernel: it reads
//! `/proc` through the [`FileSystem`] trait and turns variable, partially
//! readable kernel files into fixed-schema counter structs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  ProcessCollector   │   │     SystemCollector         │  │
//! │  │  - /proc/[pid]/stat │   │  - /proc/meminfo            │  │
//! │  │  - /proc/[pid]/io   │   │  - /proc/stat               │  │
//! │  │  - /proc/[pid]/...  │   │  - /proc/diskstats          │  │
//! │  └──────────┬──────────┘   └──────────────┬──────────────┘  │
//! │             └──────────────┬──────────────┘                 │
//! │                     ┌──────▼──────┐                         │
//! │                     │  FileSystem │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!                      ┌───────┴───────┐
//!               ┌──────▼──────┐ ┌──────▼──────┐
//!               │   RealFs    │ │   MockFs    │
//!               │ (Linux)     │ │ (Testing)   │
//!               └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use psmon_core::collector::{MockFs, ProcessCollector};
//!
//! let fs = MockFs::typical_system();
//! let collector = ProcessCollector::new(fs, "/proc");
//! let processes = collector.list_processes().unwrap();
//! assert!(!processes.is_empty());
//! ```

pub mod mock;
pub mod procfs;
pub mod traits;

pub use mock::{MockFs, MockProcess};
pub use procfs::{
    CLK_TCK, CollectError, CounterReader, DiskCounters, ProcessCollector, ProcessCounters,
    ProcessEntry, SystemCollector,
};
pub use traits::{DiskUsage, FileSystem, RealFs};
