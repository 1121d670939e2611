use std::fmt;

use super::catch::Catch;
use crate::context::ProblemContext;
use crate::error::DynError;

type Predicate = Box<dyn Fn(&ProblemContext, &DynError) -> bool + Send + Sync>;

/// Decides whether an error bypasses problem details and propagates.
pub struct RethrowRule {
    error_type: &'static str,
    predicate: Predicate,
}

impl RethrowRule {
    /// Rule matching every `E`.
    #[must_use]
    pub fn unconditional<E: Catch + ?Sized>() -> Self {
        Self::new::<E, _>(|_, _| true)
    }

    /// Rule matching `E` when `predicate` holds. The type check runs first.
    #[must_use]
    pub fn new<E, P>(predicate: P) -> Self
    where
        E: Catch + ?Sized,
        P: Fn(&ProblemContext, &E) -> bool + Send + Sync + 'static,
    {
        Self {
            error_type: E::type_name(),
            predicate: Box::new(move |ctx: &ProblemContext, error: &DynError| {
                E::catch(error).is_some_and(|e| predicate(ctx, e))
            }),
        }
    }

    /// Rule matching any error at all.
    #[must_use]
    pub fn always() -> Self {
        Self {
            error_type: "*",
            predicate: Box::new(|_: &ProblemContext, _: &DynError| true),
        }
    }

    #[must_use]
    pub fn error_type(&self) -> &'static str {
        self.error_type
    }

    #[must_use]
    pub fn matches(&self, ctx: &ProblemContext, error: &DynError) -> bool {
        (self.predicate)(ctx, error)
    }
}

impl fmt::Debug for RethrowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RethrowRule")
            .field("error_type", &self.error_type)
            .finish_non_exhaustive()
    }
}
