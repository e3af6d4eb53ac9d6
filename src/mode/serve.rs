//! SERVE: forward live, padded to the recorded latency.

use log::debug;

use super::{Controller, HandleFuture};
use crate::model::RequestRecord;

pub(super) fn handle(controller: &Controller, request: RequestRecord) -> HandleFuture<'_> {
    Box::pin(async move {
        let recorded = controller.store.find_first_match(&request).await;
        let (response, observed) = controller.forward(&request).await;

        match recorded {
            Some(recorded) if !response.is_error() => {
                let added = controller.timing.pad_latency(recorded.latency, observed).await;
                debug!("Padded {} by {:.3}s", request.path(), added.as_secs_f64());
            }
            Some(_) => {}
            None => debug!("No recorded latency for {} {}", request.method(), request.path()),
        }

        controller.reporter.record_metadata().await;
        response
    })
}
