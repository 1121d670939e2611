//! RFC 7807 Problem Details for HTTP APIs (pure data model, no HTTP framework dependencies)

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Content type for Problem Details as per RFC 7807.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Default `type` when no problem link is known.
pub const ABOUT_BLANK: &str = "about:blank";

/// Extension member carrying the request trace id.
pub const TRACE_ID_EXTENSION: &str = "traceId";

/// Custom serializer for `StatusCode` to u16
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

/// Custom deserializer for `StatusCode` from u16
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// Unknown members found while deserializing land in [`Problem::extensions`],
/// and extensions are flattened back into the top-level object on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type", default = "default_type_url")]
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code for this occurrence of the problem.
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: StatusCode,
    /// A human-readable explanation specific to this occurrence of the problem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies the specific occurrence of the problem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Validation errors for 4xx problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationViolation>>,
    /// Extension members.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

fn default_type_url() -> String {
    ABOUT_BLANK.to_owned()
}

/// Individual validation violation for a specific field or property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// field path, e.g. "email" or "user.email"
    pub field: String,
    /// Human-readable message describing the validation error
    pub message: String,
    /// Optional machine-readable error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValidationViolation {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl Problem {
    /// Create a new Problem with the given status and title.
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            type_url: default_type_url(),
            title: title.into(),
            status,
            detail: None,
            instance: None,
            errors: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Create a Problem titled with the canonical reason phrase of `status`.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("Unknown Error"))
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    pub fn with_trace_id(self, id: impl Into<String>) -> Self {
        self.with_extension(TRACE_ID_EXTENSION, Value::String(id.into()))
    }

    pub fn with_errors(mut self, errors: Vec<ValidationViolation>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Add an extension member. Reserved member names are ignored.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_extension(key, value);
        self
    }

    pub fn insert_extension(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if is_reserved_member(&key) {
            return;
        }
        self.extensions.insert(key, value.into());
    }

    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.extensions
            .get(TRACE_ID_EXTENSION)
            .and_then(Value::as_str)
    }
}

fn is_reserved_member(key: &str) -> bool {
    matches!(
        key,
        "type" | "title" | "status" | "detail" | "instance" | "errors"
    )
}

/// Axum integration: make Problem directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        use axum::http::HeaderValue;

        let status = self.status;
        let mut resp = axum::Json(self).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn problem_builder_pattern() {
        let p = Problem::new(StatusCode::UNPROCESSABLE_ENTITY, "Validation Failed")
            .with_detail("Input validation errors")
            .with_instance("/users/123")
            .with_trace_id("req-456")
            .with_errors(vec![ValidationViolation::new("email", "Email is required")]);

        assert_eq!(p.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(p.instance.as_deref(), Some("/users/123"));
        assert_eq!(p.trace_id(), Some("req-456"));
        assert_eq!(p.errors.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn from_status_uses_reason_phrase() {
        let p = Problem::from_status(StatusCode::CONFLICT);
        assert_eq!(p.title, "Conflict");
        assert_eq!(p.type_url, ABOUT_BLANK);
    }

    #[test]
    fn problem_serializes_rfc_shape() {
        let p = Problem::new(StatusCode::NOT_FOUND, "Not Found")
            .with_type("https://httpstatuscodes.io/404")
            .with_detail("Resource not found")
            .with_extension("retryable", false);
        let json = serde_json::to_value(&p).unwrap();

        assert_eq!(json["type"], "https://httpstatuscodes.io/404");
        assert_eq!(json["status"], 404);
        assert_eq!(json["detail"], "Resource not found");
        assert_eq!(json["retryable"], false);
        assert!(json.get("instance").is_none());
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn problem_deserializes_extensions() {
        let json = r#"{"title":"Not Found","status":404,"traceId":"abc","tenant":"t1"}"#;
        let p: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(p.status, StatusCode::NOT_FOUND);
        assert_eq!(p.type_url, ABOUT_BLANK);
        assert_eq!(p.trace_id(), Some("abc"));
        assert_eq!(p.extensions.get("tenant"), Some(&Value::from("t1")));
    }

    #[test]
    fn problem_rejects_invalid_status() {
        let json = r#"{"title":"Broken","status":1000}"#;
        assert!(serde_json::from_str::<Problem>(json).is_err());
    }

    #[test]
    fn reserved_extension_names_are_ignored() {
        let p = Problem::from_status(StatusCode::BAD_REQUEST).with_extension("status", 200);
        assert!(p.extensions.is_empty());
        assert_eq!(p.status, StatusCode::BAD_REQUEST);
    }
}
