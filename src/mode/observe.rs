//! OBSERVE: forward live and report divergence from the cassette.

use log::{debug, info};

use super::{Controller, HandleFuture};
use crate::matching::responses_match;
use crate::model::RequestRecord;
use crate::report::{ReportEntry, ReportReason};

pub(super) fn handle(controller: &Controller, request: RequestRecord) -> HandleFuture<'_> {
    Box::pin(async move {
        let recorded = controller.store.find_first_match(&request).await;
        let (response, latency) = controller.forward(&request).await;

        match recorded {
            None => {
                info!("No recorded request matches {} {}", request.method(), request.path());
                let entry = ReportEntry::request_mismatch(&request, &response);
                controller.reporter.report(entry).await;
            }
            Some(original) => {
                if responses_match(&original.response, &response, &controller.response_criteria) {
                    debug!("Response for {} matches the recording", request.path());
                    if controller.report_matches {
                        let entry = ReportEntry::compared(
                            ReportReason::ResponseMatch,
                            &request,
                            &original,
                            &response,
                            latency,
                        );
                        controller.reporter.report(entry).await;
                    }
                } else {
                    info!(
                        "Response for {} {} differs from the recording",
                        request.method(),
                        request.path()
                    );
                    let entry = ReportEntry::compared(
                        ReportReason::ResponseMismatch,
                        &request,
                        &original,
                        &response,
                        latency,
                    );
                    controller.reporter.report(entry).await;
                }
            }
        }

        controller.reporter.record_metadata().await;
        response
    })
}
