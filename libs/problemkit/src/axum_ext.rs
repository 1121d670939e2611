//! Axum integration
//!
//! Handlers return [`ProblemError`] or [`ActionResult`]; the
//! [`problem_details_middleware`] picks those up on the way out and replaces
//! them with `application/problem+json` responses. Empty-bodied 4xx/5xx
//! responses (e.g. the router's 404 fallback) are converted as well.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::HttpBody as _,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use serde_json::json;

use crate::context::ProblemContext;
use crate::error::BoxError;
use crate::result::{ActionResult, Adapted, ProblemResultAdapter, is_error_status};

/// Result waiting in response extensions for the middleware.
#[derive(Clone)]
struct PendingResult(Arc<Mutex<Option<ActionResult>>>);

impl PendingResult {
    fn new(result: ActionResult) -> Self {
        Self(Arc::new(Mutex::new(Some(result))))
    }

    fn take(&self) -> Option<ActionResult> {
        self.0.lock().take()
    }
}

/// Error left unconverted, attached to the response so outer layers can see it.
#[derive(Clone, Debug)]
pub struct UnhandledError(pub Arc<BoxError>);

/// Handler error type; converted to problem details by the middleware.
pub struct ProblemError(BoxError);

impl ProblemError {
    #[must_use]
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(error.into())
    }

    #[must_use]
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    #[must_use]
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

impl<E> From<E> for ProblemError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self(Box::new(error))
    }
}

impl fmt::Debug for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl IntoResponse for ProblemError {
    fn into_response(self) -> Response {
        ActionResult::Error(self.0).into_response()
    }
}

/// Convertible results render as a bare status (text keeps its body) until
/// the middleware replaces them.
impl IntoResponse for ActionResult {
    fn into_response(self) -> Response {
        if !self.is_convertible() {
            return render_raw(self);
        }

        let mut response = match &self {
            Self::Text { status, body } => (*status, body.clone()).into_response(),
            other => other.status().into_response(),
        };
        response.extensions_mut().insert(PendingResult::new(self));
        response
    }
}

/// Render a result without problem details conversion.
fn render_raw(result: ActionResult) -> Response {
    match result {
        ActionResult::Error(error) => {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            response
                .extensions_mut()
                .insert(UnhandledError(Arc::new(error)));
            response
        }
        ActionResult::Validation(violations) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "errors": violations }))).into_response()
        }
        ActionResult::Text { status, body } => (status, body).into_response(),
        ActionResult::Status(status) => status.into_response(),
        ActionResult::Problem(problem) => problem.into_response(),
        ActionResult::Json { status, body } => (status, Json(body)).into_response(),
    }
}

/// Middleware applying the [`ProblemResultAdapter`] to outgoing responses.
pub async fn problem_details_middleware(
    State(adapter): State<Arc<ProblemResultAdapter>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let mut ctx = adapter.policy().context_for(&parts);

    let mut response = next.run(Request::from_parts(parts, body)).await;
    ctx.set_status(response.status());

    let pending = response
        .extensions_mut()
        .remove::<PendingResult>()
        .and_then(|pending| pending.take());
    if let Some(result) = pending {
        return respond(&adapter, &mut ctx, result, response.headers());
    }

    if adapter.policy().converts_empty_status_responses() && is_empty_error_response(&response) {
        let status = response.status();
        if let Adapted::Replaced(problem) = adapter.adapt(&mut ctx, ActionResult::Status(status)) {
            let mut converted = problem.into_response();
            carry_headers(response.headers(), converted.headers_mut());
            return converted;
        }
    }

    response
}

fn respond(
    adapter: &ProblemResultAdapter,
    ctx: &mut ProblemContext,
    result: ActionResult,
    original_headers: &HeaderMap,
) -> Response {
    let mut response = match adapter.adapt(ctx, result) {
        Adapted::Replaced(problem) => problem.into_response(),
        Adapted::Unchanged(result) => render_raw(result),
        Adapted::Rethrow(error) => render_raw(ActionResult::Error(error)),
    };
    carry_headers(original_headers, response.headers_mut());
    response
}

/// Copy handler-set headers, except those describing the replaced body.
fn carry_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

fn is_empty_error_response(response: &Response) -> bool {
    is_error_status(response.status())
        && !response.headers().contains_key(header::CONTENT_TYPE)
        && response.body().size_hint().exact() == Some(0)
}

/// Router helper installing [`problem_details_middleware`].
pub trait ProblemDetailsRouterExt {
    #[must_use]
    fn with_problem_details(self, adapter: Arc<ProblemResultAdapter>) -> Self;
}

impl<S> ProblemDetailsRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_problem_details(self, adapter: Arc<ProblemResultAdapter>) -> Self {
        self.layer(middleware::from_fn_with_state(adapter, problem_details_middleware))
    }
}
