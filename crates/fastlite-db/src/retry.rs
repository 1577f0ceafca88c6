//! Busy/locked retry protocol.
//!
//! The engine's file locking is cooperative: a writer on another connection
//! makes our call fail with BUSY or LOCKED until it lets go. [`RetryPolicy`]
//! hides that behind fixed-interval polling bounded by a wall-clock deadline.
//!
//! The loop has two states. ATTEMPT invokes the native call; a busy/locked
//! code with time left sleeps one interval and attempts again. Anything else,
//! or a busy code past the deadline, is DONE and returned as-is. The deadline
//! is advisory: a busy code can still come back, and the caller decides what
//! to do with it. There is no cancellation other than the deadline.

use std::ffi::c_int;
use std::thread;
use std::time::{Duration, Instant};

use fastlite_core::codes::is_busy_code;

/// Fixed-interval polling bounded by a wall-clock timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    interval: Duration,
}

impl RetryPolicy {
    /// Interval between fast-path step attempts.
    pub const STEP_INTERVAL: Duration = Duration::from_millis(50);
    /// Interval between prepare attempts, also used by command steps.
    pub const PREPARE_INTERVAL: Duration = Duration::from_millis(150);
    /// Deadline used when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Policy for advancing a statement on the fast path.
    pub const fn step(timeout: Duration) -> Self {
        Self::new(timeout, Self::STEP_INTERVAL)
    }

    /// Policy for compiling a statement.
    pub const fn prepare(timeout: Duration) -> Self {
        Self::new(timeout, Self::PREPARE_INTERVAL)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op` until it stops reporting contention or the deadline passes.
    #[inline]
    pub fn run<F>(&self, op: F) -> c_int
    where
        F: FnMut() -> c_int,
    {
        self.run_from(Instant::now(), op)
    }

    /// Like [`RetryPolicy::run`] with the deadline measured from `started`,
    /// so several calls can share one budget.
    #[inline]
    pub fn run_from<F>(&self, started: Instant, op: F) -> c_int
    where
        F: FnMut() -> c_int,
    {
        self.run_between(started, op, || {})
    }

    /// Like [`RetryPolicy::run_from`], calling `between` before each sleep.
    pub fn run_between<F, B>(&self, started: Instant, mut op: F, mut between: B) -> c_int
    where
        F: FnMut() -> c_int,
        B: FnMut(),
    {
        let mut attempts: u32 = 1;
        loop {
            let code = op();
            if !is_busy_code(code) {
                if attempts > 1 {
                    tracing::debug!(
                        "Contended call settled with code {code} after {attempts} attempts"
                    );
                }
                return code;
            }

            if started.elapsed() >= self.timeout {
                tracing::warn!(
                    "Gave up after {attempts} attempts over {:?}; still busy with code {code}",
                    started.elapsed()
                );
                return code;
            }

            between();
            thread::sleep(self.interval);
            attempts += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::step(Self::DEFAULT_TIMEOUT)
    }
}
