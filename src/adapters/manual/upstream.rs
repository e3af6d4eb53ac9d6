//! Scripted upstream answering from a queue of replies.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::adapters::manual::ManualClock;
use crate::error::UpstreamError;
use crate::model::{Headers, RequestRecord, ResponseRecord};
use crate::ports::upstream::{Upstream, UpstreamFuture};

/// One scripted answer.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    /// Response to return, or the failure message to raise.
    pub outcome: Result<ResponseRecord, String>,
    /// How far the attached clock moves while "waiting" for the reply.
    pub latency: Duration,
}

impl ScriptedReply {
    /// Replies with `response` instantly.
    #[must_use]
    pub fn respond(response: ResponseRecord) -> Self {
        Self { outcome: Ok(response), latency: Duration::ZERO }
    }

    /// Fails the call with `message`.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self { outcome: Err(message.into()), latency: Duration::ZERO }
    }

    /// Sets the simulated latency.
    #[must_use]
    pub fn after(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Upstream that pops replies in order and remembers every request.
///
/// Once the script is exhausted it answers `404 Not Found`.
#[derive(Debug, Default)]
pub struct ScriptedUpstream {
    replies: Mutex<VecDeque<ScriptedReply>>,
    repeat: Option<ScriptedReply>,
    received: Mutex<Vec<RequestRecord>>,
    clock: Option<Arc<ManualClock>>,
}

impl ScriptedUpstream {
    /// Answers with `replies` in order.
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()), ..Self::default() }
    }

    /// Answers every request with the same reply.
    #[must_use]
    pub fn repeating(reply: ScriptedReply) -> Self {
        Self { repeat: Some(reply), ..Self::default() }
    }

    /// Advances `clock` by each reply's latency.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn received(&self) -> Vec<RequestRecord> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next_reply(&self) -> ScriptedReply {
        let scripted = self.replies.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        scripted.or_else(|| self.repeat.clone()).unwrap_or_else(|| {
            let not_found = ResponseRecord::new(404, "Not Found", Headers::new(), Vec::new());
            ScriptedReply::respond(not_found)
        })
    }
}

impl Upstream for ScriptedUpstream {
    fn send(&self, request: &RequestRecord) -> UpstreamFuture<'_> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        let reply = self.next_reply();
        if let Some(clock) = &self.clock {
            clock.advance(reply.latency);
        }
        Box::pin(async move { reply.outcome.map_err(UpstreamError::Other) })
    }
}
