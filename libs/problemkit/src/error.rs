use thiserror::Error;

/// Type-erased error object every rule is evaluated against.
pub type DynError = dyn std::error::Error + Send + Sync + 'static;

/// Owned form of [`DynError`].
pub type BoxError = Box<DynError>;

/// Configuration loading and validation failures.
///
/// Raised at startup, never while serving requests.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration sources could not be read or deserialized
    #[error("failed to load problem details configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A configured status code is outside the valid range for its field
    #[error("status code {code} is not valid for `{field}`")]
    InvalidStatus { field: &'static str, code: u16 },

    /// The problem link template cannot produce a per-status URI
    #[error("problem link template '{template}' must contain the {{status}} placeholder")]
    InvalidLinkTemplate { template: String },

    /// A trace id header name is not a valid HTTP header name
    #[error("invalid trace id header name '{name}'")]
    InvalidHeaderName { name: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// A status code mapping function failed while being evaluated.
///
/// These never reach request handlers: the engine logs them and treats the
/// rule as non-matching.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MappingError {
    #[error("status code mapping for `{error_type}` failed: {source}")]
    Failed {
        error_type: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("status code mapping for `{error_type}` panicked: {message}")]
    Panicked {
        error_type: &'static str,
        message: String,
    },
}
