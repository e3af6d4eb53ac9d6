//! PLAYBACK: replay the cassette in order with its original pacing.

use std::time::Duration;

use log::{info, warn};

use super::{unavailable, Controller, HandleFuture};
use crate::matching::responses_match;
use crate::model::{RequestRecord, ResponseRecord};
use crate::report::{ReportEntry, ReportReason};

pub(super) fn handle(_controller: &Controller, request: RequestRecord) -> HandleFuture<'_> {
    Box::pin(async move {
        warn!("Ignoring inbound {} {} during playback", request.method(), request.path());
        unavailable("playback mode does not accept inbound requests")
    })
}

/// Issues every recorded request in order. Before each one, waits out its
/// recorded offset less the recorded latency of the previous interaction,
/// so the gap between recorded call completion and the next issue is kept
/// however fast the live target answers. A failed call is reported like
/// any other result and playback continues.
pub(super) async fn run(controller: &Controller) -> usize {
    let interactions = controller.store.interactions().await;
    info!("Playing back {} interactions against {}", interactions.len(), controller.target);

    let mut previous_latency = Duration::ZERO;
    for (index, recorded) in interactions.iter().enumerate() {
        controller.timing.wait_gap(recorded.offset, previous_latency).await;
        previous_latency = recorded.latency;

        let (request, response, latency) = match recorded.request.retarget(&controller.target) {
            Ok(request) => {
                let (response, latency) = controller.forward(&request).await;
                (request, response, latency)
            }
            Err(e) => {
                warn!("Interaction #{index} cannot be addressed at {}: {e}", controller.target);
                let failure = ResponseRecord::upstream_failure(e.to_string());
                (recorded.request.clone(), failure, Duration::ZERO)
            }
        };

        let criteria = &controller.response_criteria;
        let reason = if responses_match(&recorded.response, &response, criteria) {
            ReportReason::ResponseMatch
        } else {
            info!(
                "Interaction #{index} {} {} differs from the recording",
                request.method(),
                request.path()
            );
            ReportReason::ResponseMismatch
        };
        let entry = ReportEntry::compared(reason, &request, recorded, &response, latency);
        controller.reporter.report(entry).await;
        controller.reporter.record_metadata().await;
    }

    interactions.len()
}
