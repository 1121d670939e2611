//! Problem details for axum services
//!
//! Classifies handler errors into HTTP status codes through an ordered list
//! of [`StatusCodeMapper`] rules, decides which errors propagate untouched
//! via rethrow rules, and renders everything else as RFC 7807
//! `application/problem+json` bodies.
//!
//! Configure with [`ProblemDetailsOptions`], seal with
//! [`ProblemDetailsOptions::build`] and install the resulting
//! [`ProblemDetailsPolicy`] through [`ProblemDetailsRouterExt`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod axum_ext;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod hooks;
pub mod mapping;
pub mod options;
pub mod policy;
pub mod result;

pub use axum_ext::{
    ProblemDetailsRouterExt, ProblemError, UnhandledError, problem_details_middleware,
};
pub use config::ProblemDetailsConfig;
pub use context::{Environment, ProblemContext, extract_trace_id};
pub use error::{BoxError, ConfigError, DynError, MappingError};
pub use factory::{DefaultProblemDetailsFactory, ProblemDetailsFactory, ProblemDraft};
pub use mapping::{Catch, MappingRegistry, RethrowRule, StatusCodeMapper, StatusMatch};
pub use options::ProblemDetailsOptions;
pub use policy::ProblemDetailsPolicy;
pub use result::{ActionResult, Adapted, ProblemResultAdapter};

pub use problemkit_errors::{APPLICATION_PROBLEM_JSON, Problem, ValidationViolation};
