use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use fydo_openfoodfacts::SearchRequest;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::middleware::RequestId;

use super::{map_lookup_error, normalize_page_size, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    pub query: Option<String>,
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
}

/// `GET /api/products/search`: relays one upstream search page verbatim.
///
/// The body is passed through as the JSON object upstream sent, so a
/// string-typed `count` stays a string. Zero matches is still a 200 with
/// `count: 0`.
pub(super) async fn search_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let Query(params) =
        params.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;

    let term = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "bad_request",
                "query parameter is required",
            )
        })?;

    let request = SearchRequest::new(
        term,
        params.page.unwrap_or(1).max(1),
        normalize_page_size(params.page_size, state.default_page_size),
    );

    let body = state
        .client
        .fetch_search_json(&request)
        .await
        .map_err(|e| map_lookup_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        request_id = %req_id.0,
        term,
        page = request.page,
        count = ?body.get("count"),
        "search relayed"
    );
    Ok(Json(body))
}

/// `GET /api/products/{barcode}`: relays the upstream product envelope.
///
/// A "not found" envelope (`status: 0`) is passed through with HTTP 404 so
/// callers can tell it apart from a transport failure.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(barcode): Path<String>,
) -> Result<Response, ApiError> {
    let envelope = state
        .client
        .fetch_product_envelope(&barcode)
        .await
        .map_err(|e| map_lookup_error(req_id.0.clone(), &e))?;

    let status = if envelope.is_found() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    tracing::debug!(request_id = %req_id.0, barcode = %barcode.trim(), %status, "product relayed");

    Ok((status, Json(envelope)).into_response())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::tests::test_app;
    use super::*;
    use crate::middleware::RateLimitState;

    async fn get(uri: &str, server: &MockServer) -> (StatusCode, serde_json::Value) {
        let app = test_app(
            &server.uri(),
            RateLimitState::new(100, Duration::from_secs(60)),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn search_relays_upstream_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("search_terms", "Nutella"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 45,
                "page": 2,
                "page_size": 10,
                "products": [{ "code": "3017620422003", "product_name": "Nutella" }],
                "skip": 10
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = get(
            "/api/products/search?query=Nutella&page=2&pageSize=10",
            &server,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 45);
        assert_eq!(body["skip"], 10);
        assert_eq!(body["products"][0]["code"], "3017620422003");
    }

    #[tokio::test]
    async fn search_keeps_upstream_field_types() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": "45",
                "page": "1",
                "page_size": "many",
                "products": [{ "code": "3017620422003" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = get("/api/products/search?query=Nutella", &server).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], "45");
        assert_eq!(body["page"], "1");
        assert_eq!(body["page_size"], "many");
    }

    #[tokio::test]
    async fn search_applies_default_and_clamped_page_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "1"))
            .and(query_param("page_size", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0, "products": [] })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page_size", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0, "products": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = get("/api/products/search?query=milk", &server).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, _) = get("/api/products/search?query=milk&pageSize=5000", &server).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn search_without_query_is_bad_request_and_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for uri in [
            "/api/products/search",
            "/api/products/search?query=",
            "/api/products/search?query=%20%20",
            "/api/products/search?query=milk&page=abc",
        ] {
            let (status, body) = get(uri, &server).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {uri}");
            assert_eq!(body["error"]["code"], "bad_request", "uri: {uri}");
        }
    }

    #[tokio::test]
    async fn product_found_is_ok_with_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/3523230014267.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1,
                "code": "3523230014267",
                "product": { "code": "3523230014267", "product_name": "Yaourt chèvre nature" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = get("/api/products/3523230014267", &server).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 1);
        assert_eq!(body["product"]["product_name"], "Yaourt chèvre nature");
    }

    #[tokio::test]
    async fn product_not_found_is_404_with_status_zero_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/0000000000000.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 0,
                "status_verbose": "product not found",
                "code": "0000000000000"
            })))
            .mount(&server)
            .await;

        let (status, body) = get("/api/products/0000000000000", &server).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 0);
        assert_eq!(body["status_verbose"], "product not found");
    }

    #[tokio::test]
    async fn blank_barcode_is_bad_request() {
        let server = MockServer::start().await;
        let (status, body) = get("/api/products/%20%20", &server).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn slow_upstream_is_gateway_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": 1, "product": { "code": "1" } }))
                    .set_delay(Duration::from_millis(1_500)),
            )
            .mount(&server)
            .await;

        let (status, body) = get("/api/products/1", &server).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["code"], "upstream_timeout");
    }

    #[tokio::test]
    async fn upstream_server_error_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = get("/api/products/search?query=milk", &server).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "upstream_error");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        let app = test_app(
            "http://127.0.0.1:1",
            RateLimitState::new(100, Duration::from_secs(60)),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/products/1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"], "upstream_unavailable");
        assert!(json["meta"]["request_id"].is_string());
    }

    /// Serves a proxy over `upstream_url` on an ephemeral port.
    async fn spawn_proxy(upstream_url: &str) -> std::net::SocketAddr {
        let app = test_app(
            upstream_url,
            RateLimitState::new(100, Duration::from_secs(60)),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        addr
    }

    fn proxy_client(addr: std::net::SocketAddr) -> fydo_openfoodfacts::ProductLookupClient {
        fydo_openfoodfacts::ProductLookupClient::with_base_url(
            &format!("http://{addr}"),
            fydo_core::RouteLayout::Proxy,
            Duration::from_secs(5),
            "fydo-test/0.1",
        )
        .expect("client")
    }

    #[tokio::test]
    async fn client_in_proxy_layout_sees_same_outcomes_through_server() {
        use fydo_openfoodfacts::QueryOutcome;

        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/3523230014267.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1,
                "product": { "code": "3523230014267" }
            })))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/product/0000000000000.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 0,
                "status_verbose": "product not found"
            })))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("search_terms", "Nutella"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 45,
                "page": 1,
                "page_size": 20,
                "products": [{ "code": "3017620422003" }]
            })))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/product/5000000000000.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": 1, "product": { "code": "5000000000000" } }))
                    .set_delay(Duration::from_millis(1_500)),
            )
            .mount(&upstream)
            .await;

        let client = proxy_client(spawn_proxy(&upstream.uri()).await);

        assert!(client.lookup_by_barcode("3523230014267").await.is_success());
        assert_eq!(
            client.lookup_by_barcode("0000000000000").await,
            QueryOutcome::NotFound
        );
        let page = client
            .search_by_name("Nutella", 1, 20)
            .await
            .success()
            .expect("search through proxy");
        assert_eq!(page.total_count, 45);
        assert_eq!(page.items.len(), 1);

        // Proxy answers 504 `upstream_timeout`.
        assert_eq!(
            client.lookup_by_barcode("5000000000000").await,
            QueryOutcome::Timeout
        );

        // Proxy answers 502 `upstream_unavailable`.
        let stranded = proxy_client(spawn_proxy("http://127.0.0.1:1").await);
        assert!(matches!(
            stranded.lookup_by_barcode("3523230014267").await,
            QueryOutcome::NetworkError(_)
        ));
        assert!(matches!(
            stranded.search_by_name("Nutella", 1, 20).await,
            QueryOutcome::NetworkError(_)
        ));
    }
}
