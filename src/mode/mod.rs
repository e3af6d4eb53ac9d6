//! Mode Controller: the per-request state machine.
//!
//! The mode is fixed for the lifetime of a run. Each mode owns a handler
//! with the same shape, selected once through [`handler`]. Inbound modes
//! share [`Controller::forward`], which turns failed upstream calls into
//! synthesized error responses so callers always get an answer.

mod observe;
mod playback;
mod record;
mod serve;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cassette::{CassetteStore, RecordMode};
use crate::context::ServiceContext;
use crate::matching::ResponseCriteria;
use crate::model::{Headers, RequestRecord, ResponseRecord};
use crate::report::Reporter;
use crate::timing::TimingScheduler;

/// Operating mode of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Forward inbound traffic and append every exchange to the cassette.
    Record,
    /// Forward inbound traffic, padding responses to their recorded latency.
    Serve,
    /// Replay the cassette against the target with its original pacing.
    Playback,
    /// Forward inbound traffic and report where it diverges from the cassette.
    Observe,
}

impl Mode {
    /// Every mode, in configuration order.
    pub const ALL: [Self; 4] = [Self::Record, Self::Serve, Self::Playback, Self::Observe];

    /// Configuration name of the mode.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Serve => "serve",
            Self::Playback => "playback",
            Self::Observe => "observe",
        }
    }

    /// Whether the mode runs an inbound listener.
    #[must_use]
    pub fn serves_inbound(self) -> bool {
        self != Self::Playback
    }

    /// Record mode used when none is configured.
    #[must_use]
    pub fn default_record_mode(self) -> RecordMode {
        match self {
            Self::Record => RecordMode::All,
            Self::Serve | Self::Playback | Self::Observe => RecordMode::None,
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| "should be one of [record, serve, playback, observe]".to_string())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boxed future returned by a mode handler.
pub type HandleFuture<'a> = Pin<Box<dyn Future<Output = ResponseRecord> + Send + 'a>>;

/// Handles one inbound request under a particular mode.
pub type Handler = for<'a> fn(&'a Controller, RequestRecord) -> HandleFuture<'a>;

/// The handler responsible for inbound requests in `mode`.
#[must_use]
pub fn handler(mode: Mode) -> Handler {
    match mode {
        Mode::Record => record::handle,
        Mode::Serve => serve::handle,
        Mode::Playback => playback::handle,
        Mode::Observe => observe::handle,
    }
}

/// Drives one run: owns the shared cassette store, the reporter and the
/// ports every mode handler works through.
pub struct Controller {
    mode: Mode,
    handler: Handler,
    context: ServiceContext,
    store: Arc<CassetteStore>,
    reporter: Arc<Reporter>,
    timing: TimingScheduler,
    target: Url,
    response_criteria: ResponseCriteria,
    report_matches: bool,
    last_arrival: Mutex<Option<DateTime<Utc>>>,
}

impl Controller {
    /// Creates a controller for `mode` forwarding to `target`.
    ///
    /// Responses are compared on status and body and matches are not
    /// reported unless configured otherwise.
    #[must_use]
    pub fn new(
        mode: Mode,
        context: ServiceContext,
        store: Arc<CassetteStore>,
        reporter: Arc<Reporter>,
        target: Url,
    ) -> Self {
        let timing = TimingScheduler::new(Arc::clone(&context.clock));
        Self {
            mode,
            handler: handler(mode),
            context,
            store,
            reporter,
            timing,
            target,
            response_criteria: ResponseCriteria::status_and_body(),
            report_matches: false,
            last_arrival: Mutex::new(None),
        }
    }

    /// Sets the criteria used to compare live and recorded responses.
    #[must_use]
    pub fn with_response_criteria(mut self, criteria: ResponseCriteria) -> Self {
        self.response_criteria = criteria;
        self
    }

    /// Also reports comparisons that agree.
    #[must_use]
    pub fn with_report_matches(mut self, report_matches: bool) -> Self {
        self.report_matches = report_matches;
        self
    }

    /// Active mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Base URL requests are forwarded to.
    #[must_use]
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Shared cassette store.
    #[must_use]
    pub fn store(&self) -> &Arc<CassetteStore> {
        &self.store
    }

    /// Shared reporter.
    #[must_use]
    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    /// Handles one inbound request and returns the response for the caller.
    pub async fn handle(&self, request: RequestRecord) -> ResponseRecord {
        debug!("{} {} {}", self.mode, request.method(), request.path());
        (self.handler)(self, request).await
    }

    /// Replays the cassette against the target. Returns how many
    /// interactions were processed.
    pub async fn playback(&self) -> usize {
        playback::run(self).await
    }

    /// Sends `request` upstream and measures how long it took. A failed
    /// call becomes a synthesized error response.
    async fn forward(&self, request: &RequestRecord) -> (ResponseRecord, Duration) {
        let started = self.context.clock.now();
        let response = match self.context.upstream.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request to {} failed: {e}", request.base_url());
                ResponseRecord::upstream_failure(e.to_string())
            }
        };
        let latency = self.context.clock.since(started);
        debug!(
            "{} answered {} in {:.3}s",
            request.base_url(),
            response.status_code,
            latency.as_secs_f64()
        );
        (response, latency)
    }

    /// Time since the previous inbound request on this run, zero for the
    /// first. Marks now as the latest arrival.
    fn arrival_offset(&self) -> Duration {
        let now = self.context.clock.now();
        let mut last = self.last_arrival.lock().unwrap_or_else(PoisonError::into_inner);
        let offset = last.map_or(Duration::ZERO, |previous| {
            (now - previous).to_std().unwrap_or(Duration::ZERO)
        });
        *last = Some(now);
        offset
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("mode", &self.mode)
            .field("target", &self.target.as_str())
            .field("response_criteria", &self.response_criteria)
            .field("report_matches", &self.report_matches)
            .finish_non_exhaustive()
    }
}

/// Response returned when a mode cannot answer inbound traffic.
fn unavailable(message: &str) -> ResponseRecord {
    let mut headers = Headers::new();
    headers.insert("content-type", "text/plain; charset=utf-8");
    ResponseRecord::new(503, "Service Unavailable", headers, message.as_bytes().to_vec())
}
