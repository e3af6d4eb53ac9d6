//! Request and response match engine.
//!
//! Both entry points are pure: they only read the records and the criteria.

pub mod criteria;

pub use criteria::{
    Criteria, RequestCriteria, RequestCriterion, ResponseCriteria, ResponseCriterion,
};

use crate::model::{RequestRecord, ResponseRecord};

/// Whether `a` and `b` agree on every enabled request criterion.
#[must_use]
pub fn requests_match(a: &RequestRecord, b: &RequestRecord, criteria: &RequestCriteria) -> bool {
    criteria.iter().all(|criterion| request_field_matches(criterion, a, b))
}

fn request_field_matches(
    criterion: RequestCriterion,
    a: &RequestRecord,
    b: &RequestRecord,
) -> bool {
    match criterion {
        RequestCriterion::Method => a.method().eq_ignore_ascii_case(b.method()),
        RequestCriterion::Scheme => a.scheme() == b.scheme(),
        RequestCriterion::Host => a.host() == b.host(),
        RequestCriterion::Port => a.port() == b.port(),
        RequestCriterion::Path => a.path() == b.path(),
        RequestCriterion::Query => same_multiset(a.query(), b.query()),
        RequestCriterion::Body => a.body() == b.body(),
    }
}

fn same_multiset(a: &[(String, String)], b: &[(String, String)]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<_> = a.iter().collect();
    let mut b: Vec<_> = b.iter().collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Whether `a` and `b` agree on every enabled response criterion.
///
/// A response synthesized for a failed call never matches anything,
/// including another failure with the same message.
#[must_use]
pub fn responses_match(
    a: &ResponseRecord,
    b: &ResponseRecord,
    criteria: &ResponseCriteria,
) -> bool {
    if a.is_error() || b.is_error() {
        return false;
    }
    criteria.iter().all(|criterion| response_field_matches(criterion, a, b))
}

fn response_field_matches(
    criterion: ResponseCriterion,
    a: &ResponseRecord,
    b: &ResponseRecord,
) -> bool {
    match criterion {
        ResponseCriterion::Status => a.status_code == b.status_code,
        ResponseCriterion::Headers => a.headers.normalized() == b.headers.normalized(),
        ResponseCriterion::Body => bodies_match(a, b),
    }
}

fn bodies_match(a: &ResponseRecord, b: &ResponseRecord) -> bool {
    if a.headers.is_json() && b.headers.is_json() {
        let parsed_a = serde_json::from_slice::<serde_json::Value>(&a.body);
        let parsed_b = serde_json::from_slice::<serde_json::Value>(&b.body);
        return match (parsed_a, parsed_b) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
    }
    a.body == b.body
}
