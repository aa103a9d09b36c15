//! Samplers turning collected counters into output rows.
//!
//! Two samplers exist: [`SystemSampler`] for whole-machine counters and
//! [`ProcessSetSampler`] for a selected group of processes with all their
//! descendants. Both render through [`crate::fmt`] and are driven by the
//! scheduler through the [`Sampler`] trait.

pub mod aggregate;
pub mod procset;
pub mod selector;
pub mod system;

use std::time::Instant;

use crate::collector::CollectError;

pub use aggregate::{AggregateRecord, CpuTracker, ProcessTree, TreeAggregator, VisitedSet};
pub use procset::{ProcessSetSampler, SampleRow};
pub use selector::{SelectionCriteria, select_roots};
pub use system::{PreviousCounters, SystemRow, SystemSampler};

/// A source of delimited rows with a fixed header.
pub trait Sampler {
    /// Header line, including the trailing newline.
    fn header(&self) -> String;

    /// Takes one sample and renders it as a row.
    ///
    /// `timestamp` is the Unix time written to the row; `now` is the
    /// monotonic instant used for rate calculations.
    fn sample(&mut self, timestamp: i64, now: Instant) -> Result<String, CollectError>;
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn header(&self) -> String {
        (**self).header()
    }

    fn sample(&mut self, timestamp: i64, now: Instant) -> Result<String, CollectError> {
        (**self).sample(timestamp, now)
    }
}
