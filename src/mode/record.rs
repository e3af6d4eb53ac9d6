//! RECORD: forward and append every exchange.

use log::{debug, warn};

use super::{Controller, HandleFuture};
use crate::model::{Interaction, RequestRecord};

pub(super) fn handle(controller: &Controller, request: RequestRecord) -> HandleFuture<'_> {
    Box::pin(async move {
        let offset = controller.arrival_offset();
        let (response, latency) = controller.forward(&request).await;

        if response.is_error() {
            debug!("Not recording failed call to {}", request.base_url());
        } else if controller.store.record_mode().allows_writes() {
            let interaction = Interaction { request, response: response.clone(), offset, latency };
            if let Err(e) = controller.store.append(interaction).await {
                warn!("{e}");
            }
        } else {
            debug!("Record mode {} keeps the cassette unchanged", controller.store.record_mode());
        }

        controller.reporter.record_metadata().await;
        response
    })
}
