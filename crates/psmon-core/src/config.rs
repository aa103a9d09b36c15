//! Monitoring run configuration.

use std::io;
use std::time::Duration;

use crate::output::{Destination, OutputSink};
use crate::sampler::SelectionCriteria;

/// Longest accepted sampling interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// What to sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Whole-machine counters.
    System,
    /// Selected processes and all their descendants.
    ProcessSet(SelectionCriteria),
}

/// Parameters of one monitoring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub destination: Destination,
    pub flush_every_row: bool,
    pub mode: Mode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            destination: Destination::Stdout,
            flush_every_row: false,
            mode: Mode::System,
        }
    }
}

impl MonitorConfig {
    /// Checks the configuration before anything is opened or written.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.interval > MAX_INTERVAL {
            return Err(ConfigError::IntervalTooLarge(self.interval));
        }
        if let Mode::ProcessSet(criteria) = &self.mode
            && criteria.is_empty()
        {
            return Err(ConfigError::EmptySelection);
        }
        Ok(())
    }

    /// Opens the output destination.
    pub fn open_sink(&self) -> Result<OutputSink, ConfigError> {
        OutputSink::open(&self.destination, self.flush_every_row).map_err(|source| {
            ConfigError::Destination {
                destination: self.destination.to_string(),
                source,
            }
        })
    }
}

/// Invalid configuration, detected before the first row is written.
#[derive(Debug)]
pub enum ConfigError {
    /// Sampling interval must be at least one second.
    ZeroInterval,
    /// Sampling interval above [`MAX_INTERVAL`].
    IntervalTooLarge(Duration),
    /// Process-set mode without any pid or keyword.
    EmptySelection,
    /// The output destination could not be opened for appending.
    Destination {
        destination: String,
        source: io::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroInterval => write!(f, "interval must be a positive number of seconds"),
            ConfigError::IntervalTooLarge(interval) => write!(
                f,
                "interval of {}s exceeds the maximum of {}s",
                interval.as_secs(),
                MAX_INTERVAL.as_secs()
            ),
            ConfigError::EmptySelection => {
                write!(f, "process selection needs at least one pid or keyword")
            }
            ConfigError::Destination {
                destination,
                source,
            } => write!(f, "cannot open {} for appending: {}", destination, source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Destination { source, .. } => Some(source),
            _ => None,
        }
    }
}
