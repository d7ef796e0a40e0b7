use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, warn};

use super::domain::ClientContext;
use super::notification::ApplicationNotifier;
use super::service::{RelayError, RelayService};
use super::validation::parse_submission;
use super::verification::TokenVerifier;

pub const APPLY_PATH: &str = "/api/apply";
const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

/// Router exposing the application relay, answering every request with JSON.
pub fn relay_router<V, N>(service: Arc<RelayService<V, N>>) -> Router
where
    V: TokenVerifier + 'static,
    N: ApplicationNotifier + 'static,
{
    Router::new()
        .route(
            APPLY_PATH,
            post(apply_handler::<V, N>)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .fallback(fallback_handler)
        .with_state(service)
        .layer(CatchPanicLayer::custom(panic_response))
}

pub(crate) async fn apply_handler<V, N>(
    State(service): State<Arc<RelayService<V, N>>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    V: TokenVerifier + 'static,
    N: ApplicationNotifier + 'static,
{
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "unable to read request body");
            return json_response(
                rejection.status(),
                json!({ "error": rejection.body_text() }),
            );
        }
    };

    let submission = match parse_submission(&headers, &body) {
        Ok(submission) => submission,
        Err(err) => return RelayError::from(err).into_response(),
    };

    let context = ClientContext::from_headers(&headers);
    match service.relay(submission, context).await {
        Ok(()) => json_response(StatusCode::OK, json!({ "ok": true })),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn preflight_handler(headers: HeaderMap) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, origin),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type"),
            ),
            (
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
            ),
        ],
    )
        .into_response()
}

async fn method_not_allowed() -> Response {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        json!({ "error": "Method not allowed" }),
    )
}

/// Preflight is answered on any path; everything else off the relay route is unknown.
async fn fallback_handler(method: Method, headers: HeaderMap) -> Response {
    if method == Method::OPTIONS {
        return preflight_handler(headers).await;
    }
    json_response(StatusCode::NOT_FOUND, json!({ "error": "Not found" }))
}

/// JSON body with the relay's caching and cross-origin headers.
pub fn json_response(status: StatusCode, payload: Value) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Json(payload),
    )
        .into_response()
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::VerificationFailed => StatusCode::FORBIDDEN,
            RelayError::NotificationRejected { .. } => StatusCode::BAD_GATEWAY,
            RelayError::Misconfigured(_) | RelayError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if let RelayError::Unexpected(detail) = &self {
            error!(%detail, "relay failed unexpectedly");
        }

        let payload = match self.detail() {
            Some(detail) => json!({ "error": self.to_string(), "detail": detail }),
            None => json!({ "error": self.to_string() }),
        };
        json_response(status, payload)
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "handler panicked".to_string()
    };
    RelayError::Unexpected(detail).into_response()
}
