//! HTTP client for the OpenFoodFacts product and search endpoints.
//!
//! One client serves both the proxy and direct callers: the base URL and
//! [`RouteLayout`] decide whether requests go to upstream or to a running
//! `fydo-server`. Every request is bounded by a single configured timeout and
//! nothing is retried.

use std::time::Duration;

use fydo_core::config::DEFAULT_OFF_BASE_URL;
use fydo_core::{AppConfig, RouteLayout};
use reqwest::{header, Client, StatusCode, Url};
use serde_json::{Map, Value};

use crate::error::LookupError;
use crate::outcome::QueryOutcome;
use crate::types::{
    normalize_barcode, ProductEnvelope, ProductQuery, ProductRecord, ProxyErrorBody,
    ProxyErrorDetail, QueryPayload, SearchEnvelope, SearchRequest, SearchResultPage,
};

/// Client for product lookups and text search.
///
/// Use [`ProductLookupClient::from_config`] in the binaries or
/// [`ProductLookupClient::with_base_url`] to point at a mock server in tests.
pub struct ProductLookupClient {
    client: Client,
    base_url: Url,
    layout: RouteLayout,
    timeout: Duration,
    search_fields: Option<String>,
}

impl ProductLookupClient {
    /// Creates a client pointed at the public OpenFoodFacts API.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, LookupError> {
        Self::with_base_url(DEFAULT_OFF_BASE_URL, RouteLayout::Upstream, timeout, user_agent)
    }

    /// Creates a client from the workspace configuration.
    ///
    /// # Errors
    ///
    /// Same as [`ProductLookupClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, LookupError> {
        let client = Self::with_base_url(
            &config.off_base_url,
            config.off_layout,
            Duration::from_secs(config.off_timeout_secs),
            &config.off_user_agent,
        )?;
        Ok(client.with_search_fields(&config.off_search_fields))
    }

    /// Creates a client with a custom base URL and route layout.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`LookupError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(
        base_url: &str,
        layout: RouteLayout,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout_for(timeout))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| LookupError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(LookupError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: "expected an absolute http(s) URL".to_owned(),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
            layout,
            timeout,
            search_fields: None,
        })
    }

    /// Restricts search responses to a comma-separated field list. Ignored
    /// in the proxy layout, where the proxy applies its own projection.
    #[must_use]
    pub fn with_search_fields(mut self, fields: &str) -> Self {
        let fields = fields.trim();
        self.search_fields = (!fields.is_empty()).then(|| fields.to_owned());
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn layout(&self) -> RouteLayout {
        self.layout
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Outcome-level operations
    // -----------------------------------------------------------------------

    /// Looks up one product by barcode.
    ///
    /// A blank barcode resolves to [`QueryOutcome::InvalidInput`] without any
    /// request. Otherwise exactly one GET is issued and the result is
    /// `Success`, `NotFound` (upstream `status: 0`), or a failure outcome.
    pub async fn lookup_by_barcode(&self, barcode: &str) -> QueryOutcome<ProductRecord> {
        let outcome = match self.fetch_product_envelope(barcode).await {
            Ok(envelope) => match envelope.into_product() {
                Some(product) => QueryOutcome::Success(product),
                None => QueryOutcome::NotFound,
            },
            Err(err) => err.into(),
        };
        log_outcome("product", &outcome);
        outcome
    }

    /// Drill-down from a search result list. Same contract as
    /// [`Self::lookup_by_barcode`]; never touches any search accumulation.
    pub async fn select_by_identifier(&self, code: &str) -> QueryOutcome<ProductRecord> {
        self.lookup_by_barcode(code).await
    }

    /// Fetches one page of a text search.
    pub async fn search_by_name(
        &self,
        term: &str,
        page: u32,
        page_size: u32,
    ) -> QueryOutcome<SearchResultPage> {
        self.search(&SearchRequest::new(term, page, page_size)).await
    }

    /// Fetches the page described by `request`.
    ///
    /// A zero count or an empty item list resolves to
    /// [`QueryOutcome::NotFound`], so callers can render an empty state.
    pub async fn search(&self, request: &SearchRequest) -> QueryOutcome<SearchResultPage> {
        let outcome = match self.fetch_search_envelope(request).await {
            Ok(envelope) => {
                let page = envelope.into_page(request);
                if page.is_empty() {
                    QueryOutcome::NotFound
                } else {
                    QueryOutcome::Success(page)
                }
            }
            Err(err) => err.into(),
        };
        log_outcome("search", &outcome);
        outcome
    }

    /// Dispatches a [`ProductQuery`] to the matching operation.
    pub async fn execute(&self, query: &ProductQuery) -> QueryOutcome<QueryPayload> {
        match query {
            ProductQuery::ByBarcode { barcode } => self
                .lookup_by_barcode(barcode)
                .await
                .map(QueryPayload::Product),
            ProductQuery::ByName {
                term,
                page,
                page_size,
            } => self
                .search_by_name(term, *page, *page_size)
                .await
                .map(QueryPayload::Page),
        }
    }

    // -----------------------------------------------------------------------
    // Envelope-level operations
    // -----------------------------------------------------------------------

    /// Fetches the raw product envelope for `barcode`.
    ///
    /// Returns `Ok` both for a found product and for an explicit upstream
    /// "not found" envelope (`status: 0`), including when upstream pairs the
    /// latter with HTTP 404.
    ///
    /// # Errors
    ///
    /// - [`LookupError::InvalidInput`] for a blank barcode (no request sent).
    /// - [`LookupError::Timeout`] when the configured timeout elapses.
    /// - [`LookupError::Http`] on transport failure.
    /// - [`LookupError::Upstream`] on any other non-2xx status.
    /// - [`LookupError::Unreachable`] when a proxy reports that upstream is
    ///   down (proxy layout only).
    /// - [`LookupError::Deserialize`] / [`LookupError::UnexpectedPayload`]
    ///   when a 2xx body is not a usable envelope.
    pub async fn fetch_product_envelope(
        &self,
        barcode: &str,
    ) -> Result<ProductEnvelope, LookupError> {
        let code = normalize_barcode(barcode)?;
        let url = self.product_url(code)?;
        let (status, body) = self.get(&url).await?;

        if status == StatusCode::NOT_FOUND {
            return match serde_json::from_str::<ProductEnvelope>(&body) {
                Ok(envelope) if envelope.is_not_found() => Ok(envelope),
                _ => Err(self.status_error(status, &url, &body)),
            };
        }

        if !status.is_success() {
            return Err(self.status_error(status, &url, &body));
        }

        let envelope: ProductEnvelope =
            serde_json::from_str(&body).map_err(|e| LookupError::Deserialize {
                context: format!("product(code={code})"),
                source: e,
            })?;

        if envelope.is_found() || envelope.is_not_found() {
            Ok(envelope)
        } else {
            Err(LookupError::UnexpectedPayload {
                context: format!("product(code={code})"),
                reason: "envelope carries neither a product nor status 0".to_owned(),
            })
        }
    }

    /// Fetches the search body for `request` as the JSON object upstream
    /// sent, without normalising any field.
    ///
    /// # Errors
    ///
    /// - [`LookupError::InvalidInput`] when `request` fails validation.
    /// - [`LookupError::Timeout`] / [`LookupError::Http`] /
    ///   [`LookupError::Upstream`] as for [`Self::fetch_product_envelope`].
    /// - [`LookupError::Deserialize`] if the body is not JSON.
    /// - [`LookupError::UnexpectedPayload`] if it is JSON but not an object.
    pub async fn fetch_search_json(
        &self,
        request: &SearchRequest,
    ) -> Result<Map<String, Value>, LookupError> {
        request.validate()?;
        let url = self.search_url(request)?;
        let (status, body) = self.get(&url).await?;

        if !status.is_success() {
            return Err(self.status_error(status, &url, &body));
        }

        let context = || format!("search(term={}, page={})", request.term(), request.page);
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(LookupError::UnexpectedPayload {
                context: context(),
                reason: "search body is not a JSON object".to_owned(),
            }),
            Err(e) => Err(LookupError::Deserialize {
                context: context(),
                source: e,
            }),
        }
    }

    /// Fetches the search envelope for `request`, with numeric fields parsed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_search_json`], plus [`LookupError::Deserialize`]
    /// when a pagination field is neither a number nor a numeric string.
    pub async fn fetch_search_envelope(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchEnvelope, LookupError> {
        let fields = self.fetch_search_json(request).await?;
        serde_json::from_value(Value::Object(fields)).map_err(|e| LookupError::Deserialize {
            context: format!("search(term={}, page={})", request.term(), request.page),
            source: e,
        })
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    /// Builds the product URL; the code is percent-encoded as a path segment.
    fn product_url(&self, code: &str) -> Result<Url, LookupError> {
        match self.layout {
            RouteLayout::Upstream => {
                let file = format!("{code}.json");
                self.url_with_segments(&["product", file.as_str()])
            }
            RouteLayout::Proxy => self.url_with_segments(&["api", "products", code]),
        }
    }

    fn search_url(&self, request: &SearchRequest) -> Result<Url, LookupError> {
        let page = request.page.to_string();
        let page_size = request.page_size.to_string();

        let mut url = match self.layout {
            RouteLayout::Upstream => self.url_with_segments(&["search"])?,
            RouteLayout::Proxy => self.url_with_segments(&["api", "products", "search"])?,
        };
        {
            let mut pairs = url.query_pairs_mut();
            match self.layout {
                RouteLayout::Upstream => {
                    pairs.append_pair("search_terms", request.term());
                    pairs.append_pair("page", &page);
                    pairs.append_pair("page_size", &page_size);
                    if let Some(fields) = &self.search_fields {
                        pairs.append_pair("fields", fields);
                    }
                }
                RouteLayout::Proxy => {
                    pairs.append_pair("query", request.term());
                    pairs.append_pair("page", &page);
                    pairs.append_pair("pageSize", &page_size);
                }
            }
        }
        Ok(url)
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| LookupError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a GET and reads the full body within the configured timeout.
    async fn get(&self, url: &Url) -> Result<(StatusCode, String), LookupError> {
        tracing::debug!(url = %url, "product-data request");
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify_transport(e))?;
        Ok((status, body))
    }

    /// Error for a non-2xx answer. Behind the proxy, its error code is
    /// decoded so a relayed timeout or unreachable upstream keeps its class.
    fn status_error(&self, status: StatusCode, url: &Url, body: &str) -> LookupError {
        if self.layout == RouteLayout::Proxy {
            if let Ok(relayed) = serde_json::from_str::<ProxyErrorBody>(body) {
                let ProxyErrorDetail { code, message } = relayed.error;
                match code.as_str() {
                    "upstream_timeout" => {
                        return LookupError::Timeout {
                            timeout: self.timeout,
                        }
                    }
                    "upstream_unavailable" => return LookupError::Unreachable { message },
                    "bad_request" => return LookupError::InvalidInput(message),
                    _ => {}
                }
            }
        }
        LookupError::Upstream {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }

    fn classify_transport(&self, err: reqwest::Error) -> LookupError {
        if err.is_timeout() {
            LookupError::Timeout {
                timeout: self.timeout,
            }
        } else {
            LookupError::Http(err)
        }
    }
}

/// Upper bound on the TCP/TLS connect phase.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout for a request budget: never longer than the budget
/// itself nor than [`MAX_CONNECT_TIMEOUT`].
fn connect_timeout_for(timeout: Duration) -> Duration {
    timeout.min(MAX_CONNECT_TIMEOUT)
}

fn log_outcome<T>(operation: &'static str, outcome: &QueryOutcome<T>) {
    match outcome {
        QueryOutcome::Success(_) | QueryOutcome::NotFound => {
            tracing::debug!(operation, outcome = outcome.kind(), "product-data query resolved");
        }
        QueryOutcome::InvalidInput(reason) => {
            tracing::debug!(operation, reason = %reason, "product-data query rejected");
        }
        _ => {
            tracing::warn!(operation, outcome = outcome.kind(), "product-data query failed");
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
