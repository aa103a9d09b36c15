//! Append-only output sink for sampler rows.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::error::SinkError;

/// Where rows are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// Standard-output sentinel accepted wherever a path is.
    pub const STDOUT_SENTINEL: &'static str = "-";

    /// Parses a destination argument; `"-"` and an empty string mean stdout.
    pub fn parse(arg: &str) -> Self {
        if arg.is_empty() || arg == Self::STDOUT_SENTINEL {
            Destination::Stdout
        } else {
            Destination::File(PathBuf::from(arg))
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Stdout => write!(f, "<stdout>"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Writes rows to a destination, never rewriting what is already there.
///
/// Rows are buffered unless `flush_every_row` is set. The sink is closed
/// exactly once: by [`OutputSink::close`] or, failing that, on drop.
pub struct OutputSink {
    writer: Option<Box<dyn Write + Send>>,
    flush_every_row: bool,
    rows: u64,
    name: String,
}

impl OutputSink {
    /// Opens `destination`. Existing files are appended to, never truncated.
    pub fn open(destination: &Destination, flush_every_row: bool) -> io::Result<Self> {
        let writer: Box<dyn Write + Send> = match destination {
            Destination::Stdout => Box::new(BufWriter::new(io::stdout())),
            Destination::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Box::new(BufWriter::new(file))
            }
        };
        debug!("output opened: {}", destination);
        Ok(Self {
            writer: Some(writer),
            flush_every_row,
            rows: 0,
            name: destination.to_string(),
        })
    }

    /// Wraps an arbitrary writer.
    pub fn from_writer(writer: impl Write + Send + 'static, flush_every_row: bool) -> Self {
        Self {
            writer: Some(Box::new(writer)),
            flush_every_row,
            rows: 0,
            name: "<writer>".to_string(),
        }
    }

    /// Writes one complete line (header or row).
    pub fn write_row(&mut self, line: &str) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(line.as_bytes())?;
        if self.flush_every_row {
            writer.flush()?;
        }
        self.rows += 1;
        Ok(())
    }

    /// Lines written so far, header included.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Flushes and releases the writer. Later calls do nothing.
    pub fn close(&mut self) -> Result<(), SinkError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush()?;
        info!("output {} closed after {} lines", self.name, self.rows);
        Ok(())
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("failed to close output {}: {}", self.name, e);
        }
    }
}
