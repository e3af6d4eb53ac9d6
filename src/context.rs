//! Service context bundling all port trait objects.

use std::sync::Arc;

use crate::adapters::live::{LiveClock, LiveUpstream};
use crate::error::UpstreamError;
use crate::ports::{Clock, Upstream};

/// Bundles the port trait objects a run works through.
///
/// Each field provides access to one external boundary. Constructors wire
/// up different adapter implementations (live or manual).
#[derive(Clone)]
pub struct ServiceContext {
    /// Clock for timestamps, latency measurement and sleeping.
    pub clock: Arc<dyn Clock>,
    /// Upstream the simulator forwards to.
    pub upstream: Arc<dyn Upstream>,
}

impl ServiceContext {
    /// Wires the given adapters together.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, upstream: Arc<dyn Upstream>) -> Self {
        Self { clock, upstream }
    }

    /// Creates a live context: wall clock and a real HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn live() -> Result<Self, UpstreamError> {
        Ok(Self { clock: Arc::new(LiveClock), upstream: Arc::new(LiveUpstream::new()?) })
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}
