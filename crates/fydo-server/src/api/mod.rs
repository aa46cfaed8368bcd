mod products;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use fydo_openfoodfacts::{LookupError, ProductLookupClient};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

/// Upper bound on `pageSize` accepted from callers.
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ProductLookupClient>,
    pub default_page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_timeout" => StatusCode::GATEWAY_TIMEOUT,
            "upstream_unavailable" | "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Resolves the effective page size: the configured default when absent,
/// clamped to `1..=MAX_PAGE_SIZE` otherwise.
pub(super) fn normalize_page_size(page_size: Option<u32>, default: u32) -> u32 {
    page_size.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
}

/// Translates a client failure into the proxy's error envelope.
pub(super) fn map_lookup_error(request_id: String, error: &LookupError) -> ApiError {
    match error {
        LookupError::InvalidInput(message) => {
            ApiError::new(request_id, "bad_request", message.clone())
        }
        LookupError::Timeout { timeout } => {
            tracing::warn!(?timeout, "upstream request timed out");
            ApiError::new(
                request_id,
                "upstream_timeout",
                "product data service did not answer in time",
            )
        }
        LookupError::Http(_)
        | LookupError::Unreachable { .. }
        | LookupError::InvalidBaseUrl { .. } => {
            tracing::warn!(error = %error, "upstream unreachable");
            ApiError::new(
                request_id,
                "upstream_unavailable",
                "product data service is unreachable",
            )
        }
        LookupError::Upstream { .. }
        | LookupError::Deserialize { .. }
        | LookupError::UnexpectedPayload { .. } => {
            tracing::error!(error = %error, "upstream returned an unusable response");
            ApiError::new(
                request_id,
                "upstream_error",
                "product data service returned an unusable response",
            )
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

fn proxied_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/products/search", get(products::search_products))
        .route("/api/products/{barcode}", get(products::get_product))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(proxied_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData { status: "ok" },
        meta: ResponseMeta::new(req_id.0),
    })
}
