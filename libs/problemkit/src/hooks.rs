//! Overridable decision hooks and their default behavior.

use std::fmt;

use http::StatusCode;
use problemkit_errors::Problem;

use crate::context::ProblemContext;
use crate::error::DynError;

/// Default problem link template; `{status}` is replaced by the numeric code.
pub const DEFAULT_PROBLEM_LINK_TEMPLATE: &str = "https://httpstatuscodes.io/{status}";

pub const STATUS_PLACEHOLDER: &str = "{status}";

pub(crate) type IncludeDetailsHook = Box<dyn Fn(&ProblemContext, &DynError) -> bool + Send + Sync>;
pub(crate) type LogUnhandledHook =
    Box<dyn Fn(&ProblemContext, &DynError, Option<StatusCode>) -> bool + Send + Sync>;
pub(crate) type ProblemLinkHook = Box<dyn Fn(&ProblemContext, StatusCode) -> String + Send + Sync>;
pub(crate) type BeforeWriteHook = Box<dyn Fn(&ProblemContext, &mut Problem) + Send + Sync>;

pub(crate) struct Hooks {
    pub(crate) include_exception_details: IncludeDetailsHook,
    pub(crate) should_log_unhandled_error: LogUnhandledHook,
    pub(crate) problem_link: ProblemLinkHook,
    pub(crate) before_write: Option<BeforeWriteHook>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            include_exception_details: Box::new(include_exception_details),
            should_log_unhandled_error: Box::new(should_log_unhandled_error),
            problem_link: templated_problem_link(DEFAULT_PROBLEM_LINK_TEMPLATE.to_owned()),
            before_write: None,
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_write", &self.before_write.is_some())
            .finish_non_exhaustive()
    }
}

/// Error details are only exposed in development environments.
#[must_use]
pub fn include_exception_details(ctx: &ProblemContext, _error: &DynError) -> bool {
    ctx.environment().is_development()
}

/// Errors without a status, or with a status of 500 or above, are logged as unhandled.
#[must_use]
pub fn should_log_unhandled_error(
    _ctx: &ProblemContext,
    _error: &DynError,
    status: Option<StatusCode>,
) -> bool {
    status.is_none_or(|s| s.as_u16() >= 500)
}

/// Render `template` for `status`.
#[must_use]
pub fn problem_link(template: &str, status: StatusCode) -> String {
    template.replace(STATUS_PLACEHOLDER, status.as_str())
}

pub(crate) fn templated_problem_link(template: String) -> ProblemLinkHook {
    Box::new(move |_: &ProblemContext, status: StatusCode| problem_link(&template, status))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::context::Environment;
    use crate::error::BoxError;

    fn err() -> BoxError {
        Box::new(std::fmt::Error)
    }

    #[test]
    fn details_only_in_development() {
        let prod = ProblemContext::new();
        let dev = ProblemContext::new().with_service(Environment::Development);
        let staging = ProblemContext::new().with_service(Environment::Staging);

        assert!(!include_exception_details(&prod, err().as_ref()));
        assert!(include_exception_details(&dev, err().as_ref()));
        assert!(!include_exception_details(&staging, err().as_ref()));
    }

    #[test]
    fn unhandled_when_status_absent_or_server_error() {
        let ctx = ProblemContext::new();
        let e = err();

        assert!(should_log_unhandled_error(&ctx, e.as_ref(), None));
        assert!(should_log_unhandled_error(
            &ctx,
            e.as_ref(),
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        ));
        assert!(should_log_unhandled_error(
            &ctx,
            e.as_ref(),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        ));
        assert!(should_log_unhandled_error(
            &ctx,
            e.as_ref(),
            Some(StatusCode::from_u16(600).unwrap())
        ));
        assert!(should_log_unhandled_error(
            &ctx,
            e.as_ref(),
            Some(StatusCode::from_u16(999).unwrap())
        ));
        assert!(!should_log_unhandled_error(
            &ctx,
            e.as_ref(),
            Some(StatusCode::NOT_FOUND)
        ));
    }

    #[test]
    fn default_link_points_at_status_page() {
        assert_eq!(
            problem_link(DEFAULT_PROBLEM_LINK_TEMPLATE, StatusCode::NOT_FOUND),
            "https://httpstatuscodes.io/404"
        );
    }
}
