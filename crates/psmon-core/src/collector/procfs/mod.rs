//! Collectors for Linux `/proc` filesystem.
//!
//! This module provides parsers and collectors for reading system and process
//! counters from the `/proc` virtual filesystem.

pub mod parser;
pub mod process;
pub mod system;

pub use process::{
    CLK_TCK, CollectError, CounterReader, ProcessCollector, ProcessCounters, ProcessEntry,
};
pub use system::{DiskCounters, SystemCollector};
