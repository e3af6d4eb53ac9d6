//! Timing scheduler reproducing recorded pacing.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::ports::Clock;

/// Computes and performs the delays that make replayed traffic keep the
/// spacing and latency of the original recording.
#[derive(Clone)]
pub struct TimingScheduler {
    clock: Arc<dyn Clock>,
}

impl TimingScheduler {
    /// Creates a scheduler sleeping on `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// How long to wait so that `already_elapsed` grows to `target_offset`.
    #[must_use]
    pub fn reproduce_gap(target_offset: Duration, already_elapsed: Duration) -> Duration {
        target_offset.saturating_sub(already_elapsed)
    }

    /// Sleeps for whatever remains of `target_offset` after `already_elapsed`
    /// and returns the delay that was applied.
    pub async fn wait_gap(&self, target_offset: Duration, already_elapsed: Duration) -> Duration {
        let delay = Self::reproduce_gap(target_offset, already_elapsed);
        if !delay.is_zero() {
            debug!("Waiting {:.3}s to reproduce recorded timing", delay.as_secs_f64());
            self.clock.sleep(delay).await;
        }
        delay
    }

    /// Pads a response that took `observed` up to the `recorded` latency.
    pub async fn pad_latency(&self, recorded: Duration, observed: Duration) -> Duration {
        self.wait_gap(recorded, observed).await
    }
}

impl std::fmt::Debug for TimingScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingScheduler").finish_non_exhaustive()
    }
}
