//! Ordered error classification rules.
//!
//! Both rule lists are evaluated strictly in registration order and the first
//! applying rule wins. There is no reordering by specificity: a broad rule
//! registered before a narrow one shadows it.

mod catch;
mod mapper;
mod rethrow;

pub use catch::Catch;
pub use mapper::{StatusCodeMapper, StatusMatch};
pub use rethrow::RethrowRule;

use crate::context::ProblemContext;
use crate::error::DynError;

/// Status code mappings plus rethrow rules.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    status_code_mappings: Vec<StatusCodeMapper>,
    rethrow_mappings: Vec<RethrowRule>,
    rethrow_all_installed: bool,
}

impl MappingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapping at the lowest priority.
    pub fn push_mapping(&mut self, mapper: StatusCodeMapper) {
        self.status_code_mappings.push(mapper);
    }

    /// Append a rethrow rule.
    ///
    /// Rules appended after [`MappingRegistry::rethrow_all`] are kept but can
    /// never be reached.
    pub fn push_rethrow(&mut self, rule: RethrowRule) {
        if self.rethrow_all_installed {
            tracing::warn!(
                error_type = rule.error_type(),
                "rethrow rule registered after rethrow_all is unreachable"
            );
        }
        self.rethrow_mappings.push(rule);
    }

    /// Drop every rethrow rule and install a single rule matching all errors.
    pub fn rethrow_all(&mut self) {
        self.rethrow_mappings.clear();
        self.rethrow_mappings.push(RethrowRule::always());
        self.rethrow_all_installed = true;
    }

    #[must_use]
    pub fn mappings(&self) -> &[StatusCodeMapper] {
        &self.status_code_mappings
    }

    #[must_use]
    pub fn rethrow_rules(&self) -> &[RethrowRule] {
        &self.rethrow_mappings
    }

    /// Classify `error` into a status code.
    ///
    /// The first rule whose type and predicate apply is evaluated. A mapping
    /// function that fails is logged and skipped as if the rule were absent.
    #[must_use]
    pub fn try_map_status_code(
        &self,
        ctx: &ProblemContext,
        error: Option<&DynError>,
    ) -> StatusMatch {
        let Some(error) = error else {
            return StatusMatch::NoMatch;
        };

        for mapper in &self.status_code_mappings {
            if !mapper.applies(ctx, error) {
                continue;
            }
            match mapper.evaluate(ctx, error) {
                Ok(status) => return StatusMatch::Matched(status),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        error_type = mapper.error_type(),
                        "status code mapping failed; skipping rule"
                    );
                }
            }
        }

        StatusMatch::NoMatch
    }

    /// Whether `error` should propagate instead of becoming a problem response.
    #[must_use]
    pub fn should_rethrow(&self, ctx: &ProblemContext, error: &DynError) -> bool {
        self.rethrow_mappings
            .iter()
            .any(|rule| rule.matches(ctx, error))
    }
}
