//! Conversion of outgoing action results into problem details.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use problemkit_errors::{Problem, ValidationViolation};
use serde_json::Value;

use crate::context::ProblemContext;
use crate::error::BoxError;
use crate::factory::{DefaultProblemDetailsFactory, ProblemDetailsFactory, ProblemDraft};
use crate::mapping::StatusMatch;
use crate::policy::ProblemDetailsPolicy;

/// What a handler produced, before problem details conversion.
#[derive(Debug)]
pub enum ActionResult {
    /// A raw error.
    Error(BoxError),
    /// Request validation failures.
    Validation(Vec<ValidationViolation>),
    /// A plain string body with a status.
    Text { status: StatusCode, body: String },
    /// A bare status code without a body.
    Status(StatusCode),
    /// An already built problem.
    Problem(Problem),
    /// A JSON body with a status.
    Json { status: StatusCode, body: Value },
}

impl ActionResult {
    #[must_use]
    pub fn error(error: impl Into<BoxError>) -> Self {
        Self::Error(error.into())
    }

    #[must_use]
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Text {
            status,
            body: body.into(),
        }
    }

    /// Status the result carries before any conversion.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Error(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Text { status, .. } | Self::Json { status, .. } | Self::Status(status) => *status,
            Self::Problem(problem) => problem.status,
        }
    }

    /// Whether the adapter may replace this result with a problem.
    #[must_use]
    pub fn is_convertible(&self) -> bool {
        match self {
            Self::Error(_) | Self::Validation(_) => true,
            Self::Text { status, .. } | Self::Status(status) => is_error_status(*status),
            Self::Problem(_) | Self::Json { .. } => false,
        }
    }
}

/// 4xx and 5xx statuses; redirects and informational codes are left alone.
#[must_use]
pub fn is_error_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

/// Outcome of adapting an [`ActionResult`].
#[derive(Debug)]
pub enum Adapted {
    /// Respond with this problem instead.
    Replaced(Problem),
    /// Leave the original result as is.
    Unchanged(ActionResult),
    /// Let the error propagate unhandled.
    Rethrow(BoxError),
}

/// Applies the policy and factory to outgoing results.
#[derive(Clone)]
pub struct ProblemResultAdapter {
    policy: Arc<ProblemDetailsPolicy>,
    factory: Arc<dyn ProblemDetailsFactory>,
}

impl fmt::Debug for ProblemResultAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemResultAdapter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ProblemResultAdapter {
    #[must_use]
    pub fn new(policy: Arc<ProblemDetailsPolicy>) -> Self {
        let factory = Arc::new(DefaultProblemDetailsFactory::new(Arc::clone(&policy)));
        Self { policy, factory }
    }

    #[must_use]
    pub fn with_factory(
        policy: Arc<ProblemDetailsPolicy>,
        factory: Arc<dyn ProblemDetailsFactory>,
    ) -> Self {
        Self { policy, factory }
    }

    #[must_use]
    pub fn policy(&self) -> &Arc<ProblemDetailsPolicy> {
        &self.policy
    }

    /// Convert `result`, updating the context status with the chosen code.
    pub fn adapt(&self, ctx: &mut ProblemContext, result: ActionResult) -> Adapted {
        if !result.is_convertible() {
            return Adapted::Unchanged(result);
        }

        match result {
            ActionResult::Error(error) => self.adapt_error(ctx, error),
            ActionResult::Validation(violations) => {
                let status = self.policy.validation_status();
                let problem = self
                    .factory
                    .create_validation_problem(ctx, violations, Some(status));
                Adapted::Replaced(self.finish(ctx, problem))
            }
            ActionResult::Text { status, body } => {
                let problem = self
                    .factory
                    .create_problem(ctx, ProblemDraft::status(status).with_detail(body));
                Adapted::Replaced(self.finish(ctx, problem))
            }
            ActionResult::Status(status) => {
                let problem = self
                    .factory
                    .create_problem(ctx, ProblemDraft::status(status));
                Adapted::Replaced(self.finish(ctx, problem))
            }
            other @ (ActionResult::Problem(_) | ActionResult::Json { .. }) => {
                Adapted::Unchanged(other)
            }
        }
    }

    /// Rethrow check first, then status classification, then the factory.
    pub fn adapt_error(&self, ctx: &mut ProblemContext, error: BoxError) -> Adapted {
        if self.policy.should_rethrow(ctx, error.as_ref()) {
            tracing::debug!(error = %error, "error configured to propagate unhandled");
            return Adapted::Rethrow(error);
        }

        let status = match self.policy.try_map_status_code(ctx, Some(error.as_ref())) {
            StatusMatch::Matched(status) => status,
            StatusMatch::NoMatch => Some(StatusCode::INTERNAL_SERVER_ERROR),
        };

        if self
            .policy
            .should_log_unhandled_error(ctx, error.as_ref(), status)
        {
            tracing::error!(
                error = %error,
                status = status.map(|s| s.as_u16()),
                path = ctx.path(),
                "unhandled error"
            );
        }

        let include_details = self.policy.include_exception_details(ctx, error.as_ref());
        match self
            .factory
            .create_error_problem(ctx, error.as_ref(), status, include_details)
        {
            Some(problem) => Adapted::Replaced(self.finish(ctx, problem)),
            None => Adapted::Unchanged(ActionResult::Error(error)),
        }
    }

    fn finish(&self, ctx: &mut ProblemContext, mut problem: Problem) -> Problem {
        ctx.set_status(problem.status);
        self.policy.before_write(ctx, &mut problem);
        problem
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::context::Environment;
    use crate::factory::EXCEPTION_DETAILS_EXTENSION;
    use std::fmt;

    #[derive(Debug)]
    struct OrderMissing;

    impl fmt::Display for OrderMissing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("order does not exist")
        }
    }

    impl std::error::Error for OrderMissing {}

    fn adapter(options: crate::options::ProblemDetailsOptions) -> ProblemResultAdapter {
        ProblemResultAdapter::new(Arc::new(options.build()))
    }

    #[test]
    fn mapped_error_becomes_problem() {
        let adapter = adapter(
            ProblemDetailsPolicy::builder()
                .map_status_code::<OrderMissing>(StatusCode::NOT_FOUND),
        );
        let mut ctx = ProblemContext::new().with_path("/orders/1");

        let adapted = adapter.adapt(&mut ctx, ActionResult::error(OrderMissing));
        let Adapted::Replaced(problem) = adapted else {
            panic!("expected a problem");
        };
        assert_eq!(problem.status, StatusCode::NOT_FOUND);
        assert_eq!(problem.detail.as_deref(), Some("order does not exist"));
        assert_eq!(ctx.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn unmapped_error_falls_back_to_500() {
        let adapter = adapter(ProblemDetailsPolicy::builder());
        let mut ctx = ProblemContext::new();

        let adapted = adapter.adapt(&mut ctx, ActionResult::error(OrderMissing));
        let Adapted::Replaced(problem) = adapted else {
            panic!("expected a problem");
        };
        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem.detail, None);
    }

    #[test]
    fn matched_without_status_uses_500_body() {
        let adapter = adapter(
            ProblemDetailsPolicy::builder()
                .map::<OrderMissing>(|_, _| true, |_, _| None),
        );
        let mut ctx = ProblemContext::new();

        let adapted = adapter.adapt(&mut ctx, ActionResult::error(OrderMissing));
        let Adapted::Replaced(problem) = adapted else {
            panic!("expected a problem");
        };
        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rethrow_bypasses_conversion() {
        let adapter = adapter(
            ProblemDetailsPolicy::builder()
                .map_status_code::<OrderMissing>(StatusCode::NOT_FOUND)
                .ignore::<OrderMissing>(),
        );
        let mut ctx = ProblemContext::new();

        let adapted = adapter.adapt(&mut ctx, ActionResult::error(OrderMissing));
        assert!(matches!(adapted, Adapted::Rethrow(_)));
        assert_eq!(ctx.status(), None);
    }

    #[test]
    fn suppressing_factory_leaves_result_unchanged() {
        struct Suppressing;

        impl ProblemDetailsFactory for Suppressing {
            fn create_problem(&self, _ctx: &ProblemContext, draft: ProblemDraft) -> Problem {
                Problem::from_status(draft.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
            }

            fn create_error_problem(
                &self,
                _ctx: &ProblemContext,
                _error: &crate::error::DynError,
                _status: Option<StatusCode>,
                _include_details: bool,
            ) -> Option<Problem> {
                None
            }
        }

        let policy = Arc::new(ProblemDetailsPolicy::builder().build());
        let adapter = ProblemResultAdapter::with_factory(policy, Arc::new(Suppressing));
        let mut ctx = ProblemContext::new();

        let adapted = adapter.adapt(&mut ctx, ActionResult::error(OrderMissing));
        assert!(matches!(adapted, Adapted::Unchanged(ActionResult::Error(_))));
    }

    #[test]
    fn development_includes_error_details() {
        let adapter = adapter(ProblemDetailsPolicy::builder());
        let mut ctx = ProblemContext::new().with_service(Environment::Development);

        let adapted = adapter.adapt(&mut ctx, ActionResult::error(OrderMissing));
        let Adapted::Replaced(problem) = adapted else {
            panic!("expected a problem");
        };
        assert!(problem.extensions.contains_key(EXCEPTION_DETAILS_EXTENSION));
        assert_eq!(problem.detail.as_deref(), Some("order does not exist"));
    }

    #[test]
    fn validation_uses_configured_status() {
        let adapter = adapter(
            ProblemDetailsPolicy::builder()
                .validation_status(StatusCode::UNPROCESSABLE_ENTITY),
        );
        let mut ctx = ProblemContext::new();

        let result = ActionResult::Validation(vec![ValidationViolation::new("email", "required")]);
        let Adapted::Replaced(problem) = adapter.adapt(&mut ctx, result) else {
            panic!("expected a problem");
        };
        assert_eq!(problem.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(problem.errors.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn text_result_becomes_detail() {
        let adapter = adapter(ProblemDetailsPolicy::builder());
        let mut ctx = ProblemContext::new();

        let Adapted::Replaced(problem) =
            adapter.adapt(&mut ctx, ActionResult::text(StatusCode::CONFLICT, "version mismatch"))
        else {
            panic!("expected a problem");
        };
        assert_eq!(problem.status, StatusCode::CONFLICT);
        assert_eq!(problem.detail.as_deref(), Some("version mismatch"));
    }

    #[test]
    fn success_results_pass_through() {
        let adapter = adapter(ProblemDetailsPolicy::builder());
        let mut ctx = ProblemContext::new();

        let adapted = adapter.adapt(&mut ctx, ActionResult::text(StatusCode::OK, "fine"));
        assert!(matches!(adapted, Adapted::Unchanged(ActionResult::Text { .. })));

        let adapted = adapter.adapt(&mut ctx, ActionResult::Status(StatusCode::NO_CONTENT));
        assert!(matches!(adapted, Adapted::Unchanged(ActionResult::Status(_))));

        let adapted = adapter.adapt(&mut ctx, ActionResult::Status(StatusCode::NOT_MODIFIED));
        assert!(matches!(adapted, Adapted::Unchanged(ActionResult::Status(_))));
        assert_eq!(ctx.status(), None);
    }
}
