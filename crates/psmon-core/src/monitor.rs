//! The sampling loop: header once, then one row per scheduled sample.

use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::{MonitorError, SinkError};
use crate::output::OutputSink;
use crate::sampler::Sampler;
use crate::schedule::{Clock, Scheduler};

/// Runs `sampler` on `scheduler` until cancellation or a fatal error.
///
/// Row timestamps are `start_timestamp` plus whole seconds elapsed on the
/// scheduler's clock. A sample that fails to collect is logged and produces
/// no row; a failed write ends the run. The sink is closed on every path.
/// Returns how many samples fired.
pub fn run_monitor<S, C>(
    sampler: &mut S,
    sink: &mut OutputSink,
    scheduler: &mut Scheduler<C>,
    start_timestamp: i64,
) -> Result<u64, MonitorError>
where
    S: Sampler + ?Sized,
    C: Clock,
{
    let result = sample_loop(sampler, sink, scheduler, start_timestamp);
    let closed = sink.close();
    let fired = result?;
    closed?;
    Ok(fired)
}

fn sample_loop<S, C>(
    sampler: &mut S,
    sink: &mut OutputSink,
    scheduler: &mut Scheduler<C>,
    start_timestamp: i64,
) -> Result<u64, SinkError>
where
    S: Sampler + ?Sized,
    C: Clock,
{
    sink.write_row(&sampler.header())?;

    let anchor = scheduler.anchor();
    let fired = scheduler.run(|index, now: Instant| {
        let elapsed = now.saturating_duration_since(anchor).as_secs() as i64;
        match sampler.sample(start_timestamp + elapsed, now) {
            Ok(row) => sink.write_row(&row),
            Err(e) => {
                error!("sample {} skipped: {}", index, e);
                Ok(())
            }
        }
    })?;

    if fired > 0 {
        debug!("{} samples fired", fired);
    }
    info!("sampling stopped");
    Ok(fired)
}
