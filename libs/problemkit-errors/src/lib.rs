//! Core problem details types
//!
//! This crate provides pure data types for RFC 7807 error payloads, with no
//! dependencies on HTTP frameworks unless the `axum` feature is enabled.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod problem;

// Re-export commonly used types
pub use problem::{
    ABOUT_BLANK, APPLICATION_PROBLEM_JSON, Problem, TRACE_ID_EXTENSION, ValidationViolation,
};

/// Helper to attach instance and `trace_id` to a Problem
///
/// Existing values are kept when the request carries none.
pub fn finalize(mut p: Problem, instance: Option<&str>, trace_id: Option<&str>) -> Problem {
    if let Some(instance) = instance {
        p = p.with_instance(instance);
    }
    if let Some(tid) = trace_id {
        p = p.with_trace_id(tid);
    }
    p
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn finalize_sets_request_context() {
        let p = finalize(
            Problem::from_status(StatusCode::NOT_FOUND),
            Some("/orders/7"),
            Some("trace-1"),
        );
        assert_eq!(p.instance.as_deref(), Some("/orders/7"));
        assert_eq!(p.trace_id(), Some("trace-1"));
    }

    #[test]
    fn finalize_keeps_existing_values() {
        let p = finalize(
            Problem::from_status(StatusCode::NOT_FOUND).with_instance("/a"),
            None,
            None,
        );
        assert_eq!(p.instance.as_deref(), Some("/a"));
        assert_eq!(p.trace_id(), None);
    }
}
