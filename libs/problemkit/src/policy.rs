//! Sealed, read-only problem details configuration shared across requests.

use http::{HeaderName, StatusCode, request::Parts};
use problemkit_errors::Problem;

use crate::context::{Environment, ProblemContext};
use crate::error::DynError;
use crate::hooks::Hooks;
use crate::mapping::{MappingRegistry, StatusMatch};
use crate::options::ProblemDetailsOptions;

/// Immutable snapshot produced by [`ProblemDetailsOptions::build`].
///
/// Safe to share behind an `Arc` between concurrent request handlers; there
/// are no mutating methods.
#[derive(Debug)]
pub struct ProblemDetailsPolicy {
    registry: MappingRegistry,
    hooks: Hooks,
    environment: Environment,
    validation_status: StatusCode,
    trace_id_headers: Vec<HeaderName>,
    convert_empty_status_responses: bool,
}

impl ProblemDetailsPolicy {
    pub(crate) fn new(
        registry: MappingRegistry,
        hooks: Hooks,
        environment: Environment,
        validation_status: StatusCode,
        trace_id_headers: Vec<HeaderName>,
        convert_empty_status_responses: bool,
    ) -> Self {
        Self {
            registry,
            hooks,
            environment,
            validation_status,
            trace_id_headers,
            convert_empty_status_responses,
        }
    }

    #[must_use]
    pub fn builder() -> ProblemDetailsOptions {
        ProblemDetailsOptions::new()
    }

    /// Classify `error`. Callers must consult [`Self::should_rethrow`] first.
    #[must_use]
    pub fn try_map_status_code(
        &self,
        ctx: &ProblemContext,
        error: Option<&DynError>,
    ) -> StatusMatch {
        self.registry.try_map_status_code(ctx, error)
    }

    #[must_use]
    pub fn should_rethrow(&self, ctx: &ProblemContext, error: &DynError) -> bool {
        self.registry.should_rethrow(ctx, error)
    }

    #[must_use]
    pub fn include_exception_details(&self, ctx: &ProblemContext, error: &DynError) -> bool {
        (self.hooks.include_exception_details)(ctx, error)
    }

    #[must_use]
    pub fn should_log_unhandled_error(
        &self,
        ctx: &ProblemContext,
        error: &DynError,
        status: Option<StatusCode>,
    ) -> bool {
        (self.hooks.should_log_unhandled_error)(ctx, error, status)
    }

    #[must_use]
    pub fn problem_link(&self, ctx: &ProblemContext, status: StatusCode) -> String {
        (self.hooks.problem_link)(ctx, status)
    }

    pub fn before_write(&self, ctx: &ProblemContext, problem: &mut Problem) {
        if let Some(hook) = &self.hooks.before_write {
            hook(ctx, problem);
        }
    }

    #[must_use]
    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn validation_status(&self) -> StatusCode {
        self.validation_status
    }

    #[must_use]
    pub fn trace_id_headers(&self) -> &[HeaderName] {
        &self.trace_id_headers
    }

    #[must_use]
    pub fn converts_empty_status_responses(&self) -> bool {
        self.convert_empty_status_responses
    }

    /// Context for a request, with the configured environment available as a
    /// service unless the request already carries one.
    #[must_use]
    pub fn context_for(&self, parts: &Parts) -> ProblemContext {
        let mut ctx = ProblemContext::from_parts(parts, &self.trace_id_headers);
        ctx.provide_service(self.environment);
        ctx
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::ProblemDetailsConfig;
    use std::sync::Arc;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn policy_is_shareable() {
        assert_send_sync::<ProblemDetailsPolicy>();
        assert_send_sync::<Arc<ProblemDetailsPolicy>>();
    }

    #[test]
    fn defaults_without_configuration() {
        let policy = ProblemDetailsPolicy::builder().build();
        let ctx = ProblemContext::new();

        assert_eq!(policy.validation_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            policy.problem_link(&ctx, StatusCode::BAD_GATEWAY),
            "https://httpstatuscodes.io/502"
        );
        assert!(policy.converts_empty_status_responses());
        assert!(policy.registry().mappings().is_empty());
    }

    #[test]
    fn config_overrides_are_applied() {
        let config = ProblemDetailsConfig {
            environment: Environment::Staging,
            include_exception_details: Some(true),
            problem_link_template: "https://errors.example.com/{status}".to_owned(),
            validation_status: 422,
            ..ProblemDetailsConfig::default()
        };
        let policy = ProblemDetailsOptions::from_config(&config).unwrap().build();
        let ctx = ProblemContext::new();
        let err: crate::error::BoxError = Box::new(std::fmt::Error);

        assert_eq!(policy.environment(), Environment::Staging);
        assert_eq!(policy.validation_status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(policy.include_exception_details(&ctx, err.as_ref()));
        assert_eq!(
            policy.problem_link(&ctx, StatusCode::NOT_FOUND),
            "https://errors.example.com/404"
        );
    }

    #[test]
    fn context_for_provides_configured_environment() {
        let policy = ProblemDetailsPolicy::builder()
            .environment(Environment::Development)
            .build();
        let (parts, ()) = http::Request::builder()
            .uri("/x")
            .body(())
            .unwrap()
            .into_parts();

        let ctx = policy.context_for(&parts);
        assert!(ctx.environment().is_development());
        assert_eq!(ctx.path(), "/x");
    }

    #[test]
    fn before_write_hook_runs() {
        let policy = ProblemDetailsPolicy::builder()
            .on_before_write(|ctx, problem| {
                problem.insert_extension("path", ctx.path().to_owned());
            })
            .build();
        let ctx = ProblemContext::new().with_path("/orders");
        let mut problem = Problem::from_status(StatusCode::NOT_FOUND);

        policy.before_write(&ctx, &mut problem);
        assert_eq!(problem.extensions["path"], "/orders");
    }
}
