//! Clock port for reading the time and waiting.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Boxed future returned by [`Clock::sleep`], keeping the trait dyn-compatible.
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Provides the current time and cooperative sleeping.
///
/// Offsets and latencies are computed from `now`, and every deliberate
/// delay goes through `sleep`, so substituting a manual clock makes timing
/// behaviour deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspends the calling task for `duration` without blocking others.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;

    /// Time elapsed since `earlier`, zero if the clock went backwards.
    fn since(&self, earlier: DateTime<Utc>) -> Duration {
        (self.now() - earlier).to_std().unwrap_or(Duration::ZERO)
    }
}
