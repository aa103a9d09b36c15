//! Fixed-rate sampling schedule.
//!
//! Sample `i` is due at `T0 + i * interval`, where `T0` is taken when the
//! scheduler is created. A slow sample never shifts later deadlines: once it
//! finishes, every deadline that already passed fires back to back, so no
//! index is skipped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, trace, warn};

/// Longest single wait, so cancellation is noticed promptly.
pub const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Current Unix time in whole seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock backed by `Instant::now` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared stop flag, set from a signal handler and polled by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a tick function at absolute, drift-free deadlines.
pub struct Scheduler<C: Clock> {
    clock: C,
    interval: Duration,
    anchor: Instant,
    index: u64,
    token: CancellationToken,
}

impl<C: Clock> Scheduler<C> {
    /// Creates a scheduler anchored at the clock's current time.
    pub fn new(clock: C, interval: Duration, token: CancellationToken) -> Self {
        let anchor = clock.now();
        Self {
            clock,
            interval,
            anchor,
            index: 0,
            token,
        }
    }

    /// Index of the next sample to fire.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Time the schedule is anchored at (deadline of sample 0).
    pub fn anchor(&self) -> Instant {
        self.anchor
    }

    /// Absolute deadline of sample `index`, `None` if it cannot be represented.
    pub fn deadline(&self, index: u64) -> Option<Instant> {
        let nanos = self.interval.as_nanos().checked_mul(u128::from(index))?;
        let secs = u64::try_from(nanos / 1_000_000_000).ok()?;
        let offset = Duration::new(secs, (nanos % 1_000_000_000) as u32);
        self.anchor.checked_add(offset)
    }

    /// Runs `tick` once per deadline until the token is cancelled.
    ///
    /// `tick` receives the sample index and the time it actually fired.
    /// The token is checked before each wait and between wait slices; a
    /// tick that has started always runs to completion. The first tick error
    /// stops the loop and is returned. On success, returns how many samples
    /// fired.
    pub fn run<E>(
        &mut self,
        mut tick: impl FnMut(u64, Instant) -> Result<(), E>,
    ) -> Result<u64, E> {
        let mut fired = 0;
        while !self.token.is_cancelled() {
            let Some(deadline) = self.deadline(self.index) else {
                warn!("no representable deadline for sample {}, stopping", self.index);
                break;
            };
            if !self.wait_until(deadline) {
                break;
            }

            let now = self.clock.now();
            let late = now.saturating_duration_since(deadline);
            if late >= self.interval {
                debug!("sample {} fired {:?} late", self.index, late);
            }

            tick(self.index, now)?;
            self.index += 1;
            fired += 1;
        }
        trace!("scheduler stopped after {} samples", fired);
        Ok(fired)
    }

    /// Waits until `deadline`; false if cancelled first.
    fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            let now = self.clock.now();
            if now >= deadline {
                return true;
            }
            if self.token.is_cancelled() {
                return false;
            }
            self.clock.sleep((deadline - now).min(WAIT_SLICE));
        }
    }
}
