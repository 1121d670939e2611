//! Configuration-time builder for problem details behavior.
//!
//! ```ignore
//! let policy = ProblemDetailsOptions::new()
//!     .map_status_code::<InvalidArgument>(StatusCode::BAD_REQUEST)
//!     .map::<OrderError>(|_, e| e.is_missing(), |_, _| Some(StatusCode::NOT_FOUND))
//!     .ignore::<UpstreamTimeout>()
//!     .build();
//! ```
//!
//! Rules are evaluated in registration order; earlier rules win.

use std::convert::Infallible;

use http::{HeaderName, StatusCode};
use problemkit_errors::Problem;

use crate::config::ProblemDetailsConfig;
use crate::context::{Environment, ProblemContext};
use crate::error::{BoxError, ConfigError, DynError};
use crate::hooks::{Hooks, templated_problem_link};
use crate::mapping::{Catch, MappingRegistry, RethrowRule, StatusCodeMapper};
use crate::policy::ProblemDetailsPolicy;

/// Mutable builder. Consumed by [`ProblemDetailsOptions::build`], after which
/// the rules can no longer change.
#[derive(Debug)]
pub struct ProblemDetailsOptions {
    registry: MappingRegistry,
    hooks: Hooks,
    environment: Environment,
    validation_status: StatusCode,
    trace_id_headers: Vec<HeaderName>,
    convert_empty_status_responses: bool,
}

impl Default for ProblemDetailsOptions {
    fn default() -> Self {
        Self {
            registry: MappingRegistry::new(),
            hooks: Hooks::default(),
            environment: Environment::default(),
            validation_status: StatusCode::BAD_REQUEST,
            trace_id_headers: vec![
                HeaderName::from_static("x-trace-id"),
                HeaderName::from_static("x-request-id"),
                HeaderName::from_static("traceparent"),
            ],
            convert_empty_status_responses: true,
        }
    }
}

impl ProblemDetailsOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn from_config(config: &ProblemDetailsConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut options = Self {
            environment: config.environment,
            validation_status: config.validation_status_code()?,
            trace_id_headers: config.trace_header_names()?,
            convert_empty_status_responses: config.convert_empty_status_responses,
            ..Self::default()
        };
        options.hooks.problem_link = templated_problem_link(config.problem_link_template.clone());
        if let Some(include) = config.include_exception_details {
            options.hooks.include_exception_details =
                Box::new(move |_: &ProblemContext, _: &DynError| include);
        }
        Ok(options)
    }

    /// Map every `E` to `status`.
    #[must_use]
    pub fn map_status_code<E: Catch + ?Sized>(self, status: StatusCode) -> Self {
        self.map::<E>(|_, _| true, move |_, _| Some(status))
    }

    /// Map `E` through `mapping` when `predicate` holds.
    ///
    /// `mapping` may return `None` to handle the error without choosing a
    /// status; the scan still stops at this rule.
    #[must_use]
    pub fn map<E: Catch + ?Sized>(
        self,
        predicate: impl Fn(&ProblemContext, &E) -> bool + Send + Sync + 'static,
        mapping: impl Fn(&ProblemContext, &E) -> Option<StatusCode> + Send + Sync + 'static,
    ) -> Self {
        self.try_map::<E, Infallible>(predicate, move |ctx, e| Ok(mapping(ctx, e)))
    }

    /// Like [`ProblemDetailsOptions::map`] with a fallible mapping function.
    ///
    /// A failing mapping is logged and skipped during evaluation.
    #[must_use]
    pub fn try_map<E, F>(
        mut self,
        predicate: impl Fn(&ProblemContext, &E) -> bool + Send + Sync + 'static,
        mapping: impl Fn(&ProblemContext, &E) -> Result<Option<StatusCode>, F>
            + Send
            + Sync
            + 'static,
    ) -> Self
    where
        E: Catch + ?Sized,
        F: Into<BoxError>,
    {
        self.registry
            .push_mapping(StatusCodeMapper::new::<E, _, _, _>(predicate, mapping));
        self
    }

    /// Never translate `E`; let it propagate.
    #[must_use]
    pub fn ignore<E: Catch + ?Sized>(self) -> Self {
        self.rethrow::<E>()
    }

    #[must_use]
    pub fn rethrow<E: Catch + ?Sized>(mut self) -> Self {
        self.registry
            .push_rethrow(RethrowRule::unconditional::<E>());
        self
    }

    #[must_use]
    pub fn rethrow_if<E: Catch + ?Sized>(
        mut self,
        predicate: impl Fn(&ProblemContext, &E) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.registry
            .push_rethrow(RethrowRule::new::<E, _>(predicate));
        self
    }

    /// Discard every rethrow rule registered so far and rethrow all errors.
    ///
    /// Rethrow rules registered afterwards are unreachable.
    #[must_use]
    pub fn rethrow_all(mut self) -> Self {
        self.registry.rethrow_all();
        self
    }

    #[must_use]
    pub fn include_exception_details_when(
        mut self,
        hook: impl Fn(&ProblemContext, &DynError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.hooks.include_exception_details = Box::new(hook);
        self
    }

    #[must_use]
    pub fn should_log_unhandled_when(
        mut self,
        hook: impl Fn(&ProblemContext, &DynError, Option<StatusCode>) -> bool
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.hooks.should_log_unhandled_error = Box::new(hook);
        self
    }

    #[must_use]
    pub fn problem_link_with(
        mut self,
        hook: impl Fn(&ProblemContext, StatusCode) -> String + Send + Sync + 'static,
    ) -> Self {
        self.hooks.problem_link = Box::new(hook);
        self
    }

    /// Last chance to adjust a problem before it is written.
    #[must_use]
    pub fn on_before_write(
        mut self,
        hook: impl Fn(&ProblemContext, &mut Problem) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.before_write = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn validation_status(mut self, status: StatusCode) -> Self {
        self.validation_status = status;
        self
    }

    #[must_use]
    pub fn trace_id_headers(mut self, headers: Vec<HeaderName>) -> Self {
        self.trace_id_headers = headers;
        self
    }

    #[must_use]
    pub fn convert_empty_status_responses(mut self, enabled: bool) -> Self {
        self.convert_empty_status_responses = enabled;
        self
    }

    /// Seal the configuration.
    #[must_use]
    pub fn build(self) -> ProblemDetailsPolicy {
        tracing::debug!(
            mappings = self.registry.mappings().len(),
            rethrow_rules = self.registry.rethrow_rules().len(),
            environment = ?self.environment,
            "problem details policy built"
        );
        ProblemDetailsPolicy::new(
            self.registry,
            self.hooks,
            self.environment,
            self.validation_status,
            self.trace_id_headers,
            self.convert_empty_status_responses,
        )
    }
}
