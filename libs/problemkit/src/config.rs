use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use http::{HeaderName, StatusCode};
use serde::{Deserialize, Serialize};

use crate::context::Environment;
use crate::error::ConfigError;
use crate::hooks::{DEFAULT_PROBLEM_LINK_TEMPLATE, STATUS_PLACEHOLDER};

/// Prefix for environment variable overrides, e.g. `PROBLEMKIT__ENVIRONMENT=development`.
pub const ENV_PREFIX: &str = "PROBLEMKIT__";

fn default_problem_link_template() -> String {
    DEFAULT_PROBLEM_LINK_TEMPLATE.to_owned()
}

fn default_validation_status() -> u16 {
    StatusCode::BAD_REQUEST.as_u16()
}

fn default_trace_id_headers() -> Vec<String> {
    vec![
        "x-trace-id".to_owned(),
        "x-request-id".to_owned(),
        "traceparent".to_owned(),
    ]
}

fn default_convert_empty_status_responses() -> bool {
    true
}

/// Problem details configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProblemDetailsConfig {
    /// Hosting environment; drives the default error details decision
    pub environment: Environment,

    /// Force error details on or off regardless of environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_exception_details: Option<bool>,

    /// Template for the problem `type` URI; must contain `{status}`
    pub problem_link_template: String,

    /// Status used for validation problems (4xx)
    pub validation_status: u16,

    /// Request headers consulted, in order, for the trace id
    pub trace_id_headers: Vec<String>,

    /// Turn empty-bodied error responses into problem details
    pub convert_empty_status_responses: bool,
}

impl Default for ProblemDetailsConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            include_exception_details: None,
            problem_link_template: default_problem_link_template(),
            validation_status: default_validation_status(),
            trace_id_headers: default_trace_id_headers(),
            convert_empty_status_responses: default_convert_empty_status_responses(),
        }
    }
}

impl ProblemDetailsConfig {
    /// Layered load: defaults -> YAML file (if given) -> `PROBLEMKIT__*` env.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source cannot be parsed or the result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction or validation fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] for out-of-range statuses, a link template
    /// without the status placeholder, or malformed header names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validation_status_code()?;
        if !self.problem_link_template.contains(STATUS_PLACEHOLDER) {
            return Err(ConfigError::InvalidLinkTemplate {
                template: self.problem_link_template.clone(),
            });
        }
        self.trace_header_names()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStatus`] unless the status is a 4xx code.
    pub fn validation_status_code(&self) -> Result<StatusCode, ConfigError> {
        StatusCode::from_u16(self.validation_status)
            .ok()
            .filter(StatusCode::is_client_error)
            .ok_or(ConfigError::InvalidStatus {
                field: "validation_status",
                code: self.validation_status,
            })
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] for the first malformed name.
    pub fn trace_header_names(&self) -> Result<Vec<HeaderName>, ConfigError> {
        self.trace_id_headers
            .iter()
            .map(|name| {
                HeaderName::try_from(name.as_str())
                    .map_err(|_| ConfigError::InvalidHeaderName { name: name.clone() })
            })
            .collect()
    }
}
