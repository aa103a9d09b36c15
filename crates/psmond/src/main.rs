//! psmond - Process and system counter sampler.
//!
//! Writes one header line and then one delimited row per interval, either for
//! the whole machine or for a selected set of processes and their
//! descendants. Runs until SIGINT or SIGTERM.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use psmon_core::collector::RealFs;
use psmon_core::config::{Mode, MonitorConfig};
use psmon_core::error::MonitorError;
use psmon_core::monitor::run_monitor;
use psmon_core::output::Destination;
use psmon_core::sampler::{ProcessSetSampler, Sampler, SelectionCriteria, SystemSampler};
use psmon_core::schedule::{CancellationToken, Scheduler, SystemClock, now_unix};

/// Process and system counter sampler.
#[derive(Parser, Debug)]
#[command(name = "psmond", about = "Process and system counter sampler", version)]
struct Args {
    /// Sampling interval in seconds.
    #[arg(short, long, default_value = "1")]
    interval: u64,

    /// Output file, appended to. Use "-" or omit for stdout.
    #[arg(short, long)]
    output: Option<String>,

    /// Flush the output after every row.
    #[arg(short, long)]
    flush: bool,

    /// Process id to monitor together with its descendants (repeatable).
    #[arg(short, long = "pid", value_name = "PID")]
    pids: Vec<u32>,

    /// Monitor processes whose name contains this text, case-insensitive (repeatable).
    #[arg(short, long = "keyword", value_name = "TEXT")]
    keywords: Vec<String>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Do not try to raise the scheduling priority.
    #[arg(long)]
    no_renice: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Any pid or keyword selects the process-set sampler.
    fn to_config(&self) -> MonitorConfig {
        let mode = if self.pids.is_empty() && self.keywords.is_empty() {
            Mode::System
        } else {
            Mode::ProcessSet(SelectionCriteria::new(
                self.pids.iter().copied(),
                &self.keywords,
            ))
        };
        MonitorConfig {
            interval: Duration::from_secs(self.interval),
            destination: self
                .output
                .as_deref()
                .map(Destination::parse)
                .unwrap_or_default(),
            flush_every_row: self.flush,
            mode,
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
/// Logs go to stderr so rows on stdout stay clean.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("psmond={}", level).parse().unwrap())
        .add_directive(format!("psmon_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Asks for the highest scheduling priority so samples stay on time under load.
fn raise_priority() {
    // SAFETY: setpriority takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, -20) };
    if rc == 0 {
        debug!("scheduling priority raised to -20");
    } else {
        warn!(
            "could not raise scheduling priority: {}",
            io::Error::last_os_error()
        );
    }
}

fn run(args: &Args) -> Result<u64, MonitorError> {
    let config = args.to_config();
    config.validate()?;

    info!("psmond {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, output={}, flush={}, proc={}",
        args.interval, config.destination, config.flush_every_row, args.proc_path
    );

    if !args.no_renice {
        raise_priority();
    }

    let token = CancellationToken::new();
    let t = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        t.cancel();
    }) {
        warn!("Failed to set signal handler: {}", e);
    }

    let mut sink = config.open_sink()?;
    let start = now_unix();

    let mut sampler: Box<dyn Sampler> = match &config.mode {
        Mode::System => {
            info!("Sampling whole machine");
            Box::new(SystemSampler::new(RealFs::new(), &args.proc_path, start)?)
        }
        Mode::ProcessSet(criteria) => {
            info!(
                "Sampling process set: pids={:?}, keywords={:?}",
                criteria.pids(),
                criteria.keywords()
            );
            Box::new(ProcessSetSampler::new(
                RealFs::new(),
                &args.proc_path,
                criteria.clone(),
                start,
            ))
        }
    };

    let mut scheduler = Scheduler::new(SystemClock, config.interval, token);
    run_monitor(&mut sampler, &mut sink, &mut scheduler, start)
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let code = match run(&args) {
        Ok(fired) => {
            info!("Shutdown complete after {} samples", fired);
            0
        }
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}
