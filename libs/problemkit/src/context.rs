//! Per-request context handed to rules, hooks and the problem factory.

use http::{Extensions, HeaderMap, HeaderName, Method, StatusCode, request::Parts};
use serde::{Deserialize, Serialize};

/// Hosting environment of the running service.
///
/// Resolved from the context's services; used by the default
/// "include error details" hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Request-scoped view consulted while classifying an error.
#[derive(Debug, Clone, Default)]
pub struct ProblemContext {
    method: Method,
    path: String,
    trace_id: Option<String>,
    status: Option<StatusCode>,
    services: Extensions,
}

impl ProblemContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from request parts, resolving the trace id from the
    /// first matching header in `trace_headers`.
    #[must_use]
    pub fn from_parts(parts: &Parts, trace_headers: &[HeaderName]) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            trace_id: extract_trace_id(&parts.headers, trace_headers),
            status: None,
            services: parts.extensions.clone(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Register an ambient service resolvable through [`ProblemContext::service`].
    #[must_use]
    pub fn with_service<T: Clone + Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Status code chosen for the response so far.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    #[must_use]
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.services.get::<T>()
    }

    /// Insert a service unless one of the same type is already present.
    pub fn provide_service<T: Clone + Send + Sync + 'static>(&mut self, service: T) {
        if self.services.get::<T>().is_none() {
            self.services.insert(service);
        }
    }

    /// Environment registered as a service; production when absent.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.service::<Environment>().copied().unwrap_or_default()
    }
}

/// Extract the trace id from the configured headers or the current span.
#[must_use]
pub fn extract_trace_id(headers: &HeaderMap, trace_headers: &[HeaderName]) -> Option<String> {
    trace_headers
        .iter()
        .find_map(|name| headers.get(name))
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .or_else(|| {
            tracing::Span::current()
                .id()
                .map(|id| id.into_u64().to_string())
        })
}
