use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use http::StatusCode;

use super::catch::Catch;
use crate::context::ProblemContext;
use crate::error::{BoxError, DynError, MappingError};

type Predicate = Box<dyn Fn(&ProblemContext, &DynError) -> bool + Send + Sync>;
type Mapping =
    Box<dyn Fn(&ProblemContext, &DynError) -> Result<Option<StatusCode>, BoxError> + Send + Sync>;

/// Outcome of classifying an error against the status code mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMatch {
    /// No rule applied.
    NoMatch,
    /// A rule applied. `None` means the rule handled the error without
    /// choosing a status, which is distinct from [`StatusMatch::NoMatch`].
    Matched(Option<StatusCode>),
}

impl StatusMatch {
    #[must_use]
    pub const fn is_matched(self) -> bool {
        matches!(self, Self::Matched(_))
    }

    #[must_use]
    pub const fn status(self) -> Option<StatusCode> {
        match self {
            Self::Matched(status) => status,
            Self::NoMatch => None,
        }
    }
}

/// A single status code rule: error type, predicate and mapping function.
///
/// Narrowing from [`DynError`] to the bound type happens inside the stored
/// closures, which are built once when the rule is created.
pub struct StatusCodeMapper {
    error_type: &'static str,
    predicate: Predicate,
    mapping: Mapping,
}

impl StatusCodeMapper {
    #[must_use]
    pub fn new<E, P, M, F>(predicate: P, mapping: M) -> Self
    where
        E: Catch + ?Sized,
        P: Fn(&ProblemContext, &E) -> bool + Send + Sync + 'static,
        M: Fn(&ProblemContext, &E) -> Result<Option<StatusCode>, F> + Send + Sync + 'static,
        F: Into<BoxError>,
    {
        let error_type = E::type_name();
        Self {
            error_type,
            predicate: Box::new(move |ctx: &ProblemContext, error: &DynError| {
                E::catch(error).is_some_and(|e| predicate(ctx, e))
            }),
            mapping: Box::new(move |ctx: &ProblemContext, error: &DynError| match E::catch(error) {
                Some(e) => mapping(ctx, e).map_err(Into::into),
                None => Err(format!("error is not a `{error_type}`").into()),
            }),
        }
    }

    #[must_use]
    pub fn error_type(&self) -> &'static str {
        self.error_type
    }

    /// Type check plus predicate. Panics raised by the predicate propagate.
    #[must_use]
    pub fn applies(&self, ctx: &ProblemContext, error: &DynError) -> bool {
        (self.predicate)(ctx, error)
    }

    /// Invoke the mapping function behind a failure boundary.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] if the mapping function returned an error or
    /// panicked.
    pub fn evaluate(
        &self,
        ctx: &ProblemContext,
        error: &DynError,
    ) -> Result<Option<StatusCode>, MappingError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.mapping)(ctx, error))) {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(source)) => Err(MappingError::Failed {
                error_type: self.error_type,
                source,
            }),
            Err(payload) => Err(MappingError::Panicked {
                error_type: self.error_type,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl fmt::Debug for StatusCodeMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusCodeMapper")
            .field("error_type", &self.error_type)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn io_error() -> BoxError {
        Box::new(std::io::Error::other("disk full"))
    }

    #[test]
    fn applies_requires_type_and_predicate() {
        let rule = StatusCodeMapper::new::<std::io::Error, _, _, _>(
            |_, e| e.kind() == std::io::ErrorKind::Other,
            |_, _| Ok::<_, Infallible>(Some(StatusCode::INSUFFICIENT_STORAGE)),
        );
        let ctx = ProblemContext::new();

        assert!(rule.applies(&ctx, io_error().as_ref()));

        let fmt_error: BoxError = Box::new(fmt::Error);
        assert!(!rule.applies(&ctx, fmt_error.as_ref()));
    }

    #[test]
    fn evaluate_returns_mapped_status() {
        let rule = StatusCodeMapper::new::<std::io::Error, _, _, _>(
            |_, _| true,
            |_, _| Ok::<_, Infallible>(Some(StatusCode::INSUFFICIENT_STORAGE)),
        );
        let status = rule
            .evaluate(&ProblemContext::new(), io_error().as_ref())
            .unwrap();
        assert_eq!(status, Some(StatusCode::INSUFFICIENT_STORAGE));
    }

    #[test]
    fn evaluate_contains_errors() {
        let rule = StatusCodeMapper::new::<std::io::Error, _, _, _>(
            |_, _| true,
            |_, _| Err("lookup table unavailable"),
        );
        let err = rule
            .evaluate(&ProblemContext::new(), io_error().as_ref())
            .unwrap_err();
        assert!(matches!(err, MappingError::Failed { .. }));
        assert!(err.to_string().contains("lookup table unavailable"));
    }

    #[test]
    fn evaluate_contains_panics() {
        let rule = StatusCodeMapper::new::<std::io::Error, _, _, _>(
            |_, _| true,
            |_, _| -> Result<Option<StatusCode>, Infallible> { panic!("mapping exploded") },
        );
        let err = rule
            .evaluate(&ProblemContext::new(), io_error().as_ref())
            .unwrap_err();
        match err {
            MappingError::Panicked { message, .. } => assert_eq!(message, "mapping exploded"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn status_match_distinguishes_handled_without_status() {
        assert!(StatusMatch::Matched(None).is_matched());
        assert!(!StatusMatch::NoMatch.is_matched());
        assert_eq!(StatusMatch::Matched(None).status(), None);
        assert_ne!(StatusMatch::Matched(None), StatusMatch::NoMatch);
    }
}
