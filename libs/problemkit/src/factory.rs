//! Construction of [`Problem`] bodies.

use std::sync::Arc;

use http::StatusCode;
use problemkit_errors::{Problem, ValidationViolation};
use serde_json::{Value, json};

use crate::context::ProblemContext;
use crate::error::DynError;
use crate::policy::ProblemDetailsPolicy;

/// Title used for validation problems.
pub const VALIDATION_TITLE: &str = "One or more validation errors occurred.";

/// Extension member carrying error details in development.
pub const EXCEPTION_DETAILS_EXTENSION: &str = "exceptionDetails";

/// Optional fields for [`ProblemDetailsFactory::create_problem`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemDraft {
    pub status: Option<StatusCode>,
    pub title: Option<String>,
    pub type_url: Option<String>,
    pub detail: Option<String>,
    pub instance: Option<String>,
}

impl ProblemDraft {
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Builds problem bodies for the result adapter.
pub trait ProblemDetailsFactory: Send + Sync {
    /// Build a problem; absent fields are filled from the status and context.
    fn create_problem(&self, ctx: &ProblemContext, draft: ProblemDraft) -> Problem;

    /// Build a validation problem. `status` defaults to 400.
    fn create_validation_problem(
        &self,
        ctx: &ProblemContext,
        violations: Vec<ValidationViolation>,
        status: Option<StatusCode>,
    ) -> Problem {
        let draft = ProblemDraft {
            status: Some(status.unwrap_or(StatusCode::BAD_REQUEST)),
            title: Some(VALIDATION_TITLE.to_owned()),
            ..ProblemDraft::default()
        };
        self.create_problem(ctx, draft).with_errors(violations)
    }

    /// Build a problem for an error, or `None` to leave the original result
    /// untouched.
    fn create_error_problem(
        &self,
        ctx: &ProblemContext,
        error: &DynError,
        status: Option<StatusCode>,
        include_details: bool,
    ) -> Option<Problem> {
        let status = status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut draft = ProblemDraft::status(status);
        if include_details || status.as_u16() < 500 {
            draft.detail = Some(error.to_string());
        }

        let mut problem = self.create_problem(ctx, draft);
        if include_details {
            problem.insert_extension(EXCEPTION_DETAILS_EXTENSION, error_details(error));
        }
        Some(problem)
    }
}

/// Default factory: status links from the policy, instance from the request path.
#[derive(Debug, Clone)]
pub struct DefaultProblemDetailsFactory {
    policy: Arc<ProblemDetailsPolicy>,
}

impl DefaultProblemDetailsFactory {
    #[must_use]
    pub fn new(policy: Arc<ProblemDetailsPolicy>) -> Self {
        Self { policy }
    }
}

impl ProblemDetailsFactory for DefaultProblemDetailsFactory {
    fn create_problem(&self, ctx: &ProblemContext, draft: ProblemDraft) -> Problem {
        let status = draft.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let title = draft
            .title
            .unwrap_or_else(|| String::from(status.canonical_reason().unwrap_or("Unknown Error")));
        let type_url = draft
            .type_url
            .unwrap_or_else(|| self.policy.problem_link(ctx, status));

        let mut problem = Problem::new(status, title).with_type(type_url);
        if let Some(detail) = draft.detail {
            problem = problem.with_detail(detail);
        }
        let instance = draft
            .instance
            .or_else(|| (!ctx.path().is_empty()).then(|| ctx.path().to_owned()));
        problemkit_errors::finalize(problem, instance.as_deref(), ctx.trace_id())
    }
}

/// Message plus the `source()` chain of `error`, outermost first.
#[must_use]
pub fn error_details(error: &DynError) -> Value {
    let mut sources = Vec::new();
    let mut current = error.source();
    while let Some(source) = current {
        sources.push(Value::String(source.to_string()));
        current = source.source();
    }
    json!({
        "message": error.to_string(),
        "sources": sources,
    })
}
