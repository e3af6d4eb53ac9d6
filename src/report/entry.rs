//! Report entries written for compared requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cassette::format::{StoredRequest, StoredResponse};
use crate::model::{Interaction, RequestRecord, ResponseRecord};

/// Outcome a report entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportReason {
    /// No recorded request matched the live one.
    RequestMismatch,
    /// A recorded request matched but the responses differ.
    ResponseMismatch,
    /// The responses agree. Only written when matches are reported.
    ResponseMatch,
}

impl ReportReason {
    /// Whether the entry describes a disagreement.
    #[must_use]
    pub fn is_mismatch(self) -> bool {
        !matches!(self, Self::ResponseMatch)
    }
}

/// One reported comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Outcome of the comparison.
    pub reason: ReportReason,
    /// The request as issued.
    pub request: StoredRequest,
    /// Recorded response, absent when no request matched.
    pub original_response: Option<StoredResponse>,
    /// Live response.
    pub received_response: Option<StoredResponse>,
}

impl ReportEntry {
    /// Entry for a live request with no recorded counterpart.
    #[must_use]
    pub fn request_mismatch(request: &RequestRecord, received: &ResponseRecord) -> Self {
        Self {
            reason: ReportReason::RequestMismatch,
            request: StoredRequest::from_record(request, Duration::ZERO),
            original_response: None,
            received_response: Some(StoredResponse::from_record(received, Duration::ZERO)),
        }
    }

    /// Entry comparing a live response with a recorded interaction.
    #[must_use]
    pub fn compared(
        reason: ReportReason,
        request: &RequestRecord,
        original: &Interaction,
        received: &ResponseRecord,
        received_latency: Duration,
    ) -> Self {
        Self {
            reason,
            request: StoredRequest::from_record(request, original.offset),
            original_response: Some(StoredResponse::from_record(
                &original.response,
                original.latency,
            )),
            received_response: Some(StoredResponse::from_record(received, received_latency)),
        }
    }
}
