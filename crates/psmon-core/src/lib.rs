//! psmon-core - counter sampling for psmond.
//!
//! Provides:
//! - `collector` - `/proc` readers behind the `FileSystem` seam
//! - `sampler` - whole-machine and process-set samplers
//! - `fmt` - column tables shared by headers and rows
//! - `rates` - interval deltas and percentages
//! - `output` - append-only output sink
//! - `schedule` - drift-free fixed-rate scheduler and cancellation
//! - `monitor` - the sampling loop tying the above together
//! - `config`, `error` - run configuration and error types

pub mod collector;
pub mod config;
pub mod error;
pub mod fmt;
pub mod monitor;
pub mod output;
pub mod rates;
pub mod sampler;
pub mod schedule;
