use super::*;

fn test_client(base_url: &str, layout: RouteLayout) -> ProductLookupClient {
    ProductLookupClient::with_base_url(base_url, layout, Duration::from_secs(10), "fydo-test/0.1")
        .expect("client construction should not fail")
}

#[test]
fn product_url_appends_code_to_base_path() {
    let client = test_client("https://world.openfoodfacts.org/api/v2", RouteLayout::Upstream);
    let url = client.product_url("3523230014267").unwrap();
    assert_eq!(
        url.as_str(),
        "https://world.openfoodfacts.org/api/v2/product/3523230014267.json"
    );
}

#[test]
fn product_url_strips_trailing_slash() {
    let client = test_client("https://world.openfoodfacts.org/api/v2/", RouteLayout::Upstream);
    let url = client.product_url("42").unwrap();
    assert_eq!(
        url.as_str(),
        "https://world.openfoodfacts.org/api/v2/product/42.json"
    );
}

#[test]
fn product_url_encodes_path_characters() {
    let client = test_client("https://world.openfoodfacts.org/api/v2", RouteLayout::Upstream);
    let url = client.product_url("12/34 56").unwrap();
    assert_eq!(
        url.as_str(),
        "https://world.openfoodfacts.org/api/v2/product/12%2F34%2056.json"
    );
}

#[test]
fn search_url_carries_terms_paging_and_fields() {
    let client = test_client("https://world.openfoodfacts.org/api/v2", RouteLayout::Upstream)
        .with_search_fields("code,product_name");
    let url = client
        .search_url(&SearchRequest::new("pâte à tartiner & co", 2, 20))
        .unwrap();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    assert_eq!(url.path(), "/api/v2/search");
    assert_eq!(
        pairs,
        vec![
            ("search_terms".to_owned(), "pâte à tartiner & co".to_owned()),
            ("page".to_owned(), "2".to_owned()),
            ("page_size".to_owned(), "20".to_owned()),
            ("fields".to_owned(), "code,product_name".to_owned()),
        ]
    );
}

#[test]
fn proxy_layout_uses_local_routes() {
    let client = test_client("http://localhost:3001", RouteLayout::Proxy)
        .with_search_fields("code");
    assert_eq!(
        client.product_url("42").unwrap().as_str(),
        "http://localhost:3001/api/products/42"
    );
    assert_eq!(
        client
            .search_url(&SearchRequest::new("milk", 1, 10))
            .unwrap()
            .as_str(),
        "http://localhost:3001/api/products/search?query=milk&page=1&pageSize=10"
    );
}

#[test]
fn blank_search_fields_are_dropped() {
    let client = test_client("https://example.test", RouteLayout::Upstream).with_search_fields("  ");
    let url = client.search_url(&SearchRequest::new("milk", 1, 10)).unwrap();
    assert!(!url.as_str().contains("fields="), "unexpected fields param: {url}");
}

#[test]
fn rejects_non_http_base_url() {
    let result = ProductLookupClient::with_base_url(
        "mailto:someone@example.com",
        RouteLayout::Upstream,
        Duration::from_secs(1),
        "fydo-test/0.1",
    );
    assert!(matches!(result, Err(LookupError::InvalidBaseUrl { .. })));
}

#[test]
fn rejects_unparseable_base_url() {
    let result = ProductLookupClient::with_base_url(
        "not a url",
        RouteLayout::Upstream,
        Duration::from_secs(1),
        "fydo-test/0.1",
    );
    assert!(matches!(result, Err(LookupError::InvalidBaseUrl { .. })));
}

#[test]
fn connect_timeout_is_capped() {
    assert_eq!(
        connect_timeout_for(Duration::from_secs(3)),
        Duration::from_secs(3)
    );
    assert_eq!(
        connect_timeout_for(Duration::from_secs(60)),
        MAX_CONNECT_TIMEOUT
    );
}

#[test]
fn proxy_error_codes_keep_their_class() {
    let client = test_client("http://127.0.0.1:3001", RouteLayout::Proxy);
    let url = client.product_url("1").unwrap();
    let body = |code: &str| format!(r#"{{"error":{{"code":"{code}","message":"relayed"}}}}"#);

    assert!(matches!(
        client.status_error(StatusCode::GATEWAY_TIMEOUT, &url, &body("upstream_timeout")),
        LookupError::Timeout { .. }
    ));
    assert!(matches!(
        client.status_error(StatusCode::BAD_GATEWAY, &url, &body("upstream_unavailable")),
        LookupError::Unreachable { ref message } if message == "relayed"
    ));
    assert!(matches!(
        client.status_error(StatusCode::BAD_REQUEST, &url, &body("bad_request")),
        LookupError::InvalidInput(_)
    ));
    assert!(matches!(
        client.status_error(StatusCode::BAD_GATEWAY, &url, &body("upstream_error")),
        LookupError::Upstream { status: 502, .. }
    ));
}

#[test]
fn upstream_layout_ignores_proxy_error_codes() {
    let client = test_client("https://world.openfoodfacts.org/api/v2", RouteLayout::Upstream);
    let url = client.product_url("1").unwrap();
    let body = r#"{"error":{"code":"upstream_timeout","message":"x"}}"#;

    assert!(matches!(
        client.status_error(StatusCode::GATEWAY_TIMEOUT, &url, body),
        LookupError::Upstream { status: 504, .. }
    ));
}
