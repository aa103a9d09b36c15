//! Error types for the output sink and the monitoring loop.

use std::io;

use crate::collector::CollectError;
use crate::config::ConfigError;

/// Output sink failures. Both are fatal to the monitoring loop.
#[derive(Debug)]
pub enum SinkError {
    /// Writing or flushing a row failed.
    Write(io::Error),
    /// A row was written after the sink was closed.
    Closed,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Write(e) => write!(f, "failed to write output: {}", e),
            SinkError::Closed => write!(f, "output already closed"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Write(e) => Some(e),
            SinkError::Closed => None,
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::Write(e)
    }
}

/// Top-level error of a monitoring run.
#[derive(Debug)]
pub enum MonitorError {
    Config(ConfigError),
    Collect(CollectError),
    Sink(SinkError),
}

impl MonitorError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Config(_) => 2,
            MonitorError::Collect(_) | MonitorError::Sink(_) => 1,
        }
    }
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::Config(e) => write!(f, "configuration error: {}", e),
            MonitorError::Collect(e) => write!(f, "collection error: {}", e),
            MonitorError::Sink(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Config(e) => Some(e),
            MonitorError::Collect(e) => Some(e),
            MonitorError::Sink(e) => Some(e),
        }
    }
}

impl From<ConfigError> for MonitorError {
    fn from(e: ConfigError) -> Self {
        MonitorError::Config(e)
    }
}

impl From<CollectError> for MonitorError {
    fn from(e: CollectError) -> Self {
        MonitorError::Collect(e)
    }
}

impl From<SinkError> for MonitorError {
    fn from(e: SinkError) -> Self {
        MonitorError::Sink(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MonitorError::from(ConfigError::ZeroInterval).exit_code(), 2);
        assert_eq!(MonitorError::from(SinkError::Closed).exit_code(), 1);
        assert_eq!(
            MonitorError::from(CollectError::Parse("bad".into())).exit_code(),
            1
        );
    }

    #[test]
    fn test_write_error_keeps_source() {
        let err = SinkError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        assert!(err.to_string().contains("pipe closed"));
        assert!(err.source().is_some());

        let top = MonitorError::from(err);
        assert!(top.source().is_some());
    }
}
