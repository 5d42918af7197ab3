//! Timers that accumulate into the `Duration` fields of the metrics

use std::time::Duration;

#[cfg(miri)]
pub use std::time::Instant;

#[cfg(not(miri))]
pub use quanta::Instant;

/// Adds the time it is alive to the `accumulation` when dropped. Used for the
/// scopes that have early returns
#[derive(Debug)]
#[must_use = "Timer stops immediately if the guard is not bound"]
pub struct ScopedTimerGuard<'a> {
    start: Instant,
    accumulation: &'a mut Duration,
}

impl<'a> ScopedTimerGuard<'a> {
    /// Start the timer
    #[inline]
    pub fn new(accumulation: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            accumulation,
        }
    }
}

impl Drop for ScopedTimerGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        *self.accumulation += self.start.elapsed();
    }
}

/// Run `f` and add the elapsed time into `accumulation`
#[inline]
pub fn timed<T>(accumulation: &mut Duration, f: impl FnOnce() -> T) -> T {
    let _guard = ScopedTimerGuard::new(accumulation);
    f()
}
