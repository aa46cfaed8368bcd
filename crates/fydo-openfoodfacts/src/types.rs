//! OpenFoodFacts request and response types.
//!
//! Product payloads are kept as loosely typed JSON objects: upstream fills
//! fields unevenly and the proxy relays them verbatim, so [`ProductRecord`]
//! wraps a `serde_json::Map` and only offers read accessors for the fields
//! callers commonly render.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::LookupError;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A single product-data query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductQuery {
    ByBarcode { barcode: String },
    ByName { term: String, page: u32, page_size: u32 },
}

impl From<SearchRequest> for ProductQuery {
    fn from(request: SearchRequest) -> Self {
        ProductQuery::ByName {
            term: request.term,
            page: request.page,
            page_size: request.page_size,
        }
    }
}

/// One page request of a text search. The term is stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    term: String,
    pub page: u32,
    pub page_size: u32,
}

impl SearchRequest {
    #[must_use]
    pub fn new(term: &str, page: u32, page_size: u32) -> Self {
        Self {
            term: term.trim().to_owned(),
            page,
            page_size,
        }
    }

    /// First page of a new search for `term`.
    #[must_use]
    pub fn first_page(term: &str, page_size: u32) -> Self {
        Self::new(term, 1, page_size)
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Rejects blank terms, `page == 0` and `page_size == 0`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidInput`] describing the first violation.
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.term.is_empty() {
            return Err(LookupError::InvalidInput(
                "search term must not be empty".to_owned(),
            ));
        }
        if self.page == 0 {
            return Err(LookupError::InvalidInput("page must be >= 1".to_owned()));
        }
        if self.page_size == 0 {
            return Err(LookupError::InvalidInput(
                "page size must be > 0".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Trims a barcode and rejects it when nothing is left.
///
/// # Errors
///
/// Returns [`LookupError::InvalidInput`] for empty or whitespace-only input.
pub fn normalize_barcode(raw: &str) -> Result<&str, LookupError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LookupError::InvalidInput(
            "barcode must not be empty".to_owned(),
        ));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Product records
// ---------------------------------------------------------------------------

/// One product's attributes exactly as upstream returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord(Map<String, Value>);

impl ProductRecord {
    /// Raw value of any field, including ones without a typed accessor.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string value of `key`, if present.
    fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Product barcode. Upstream occasionally sends it as a number.
    #[must_use]
    pub fn code(&self) -> Option<String> {
        match self.0.get("code")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn product_name(&self) -> Option<&str> {
        self.text("product_name")
    }

    #[must_use]
    pub fn brands(&self) -> Option<&str> {
        self.text("brands")
    }

    #[must_use]
    pub fn quantity(&self) -> Option<&str> {
        self.text("quantity")
    }

    /// Best available image: full front image, then the small variant.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.text("image_url")
            .or_else(|| self.text("image_front_url"))
            .or_else(|| self.text("image_front_small_url"))
    }

    #[must_use]
    pub fn nutriscore_grade(&self) -> Option<&str> {
        self.text("nutriscore_grade")
    }

    #[must_use]
    pub fn ecoscore_grade(&self) -> Option<&str> {
        self.text("ecoscore_grade")
    }

    #[must_use]
    pub fn ingredients_text(&self) -> Option<&str> {
        self.text("ingredients_text")
    }

    /// Allergen tags such as `en:milk`; non-string entries are skipped.
    #[must_use]
    pub fn allergens_tags(&self) -> Vec<&str> {
        self.0
            .get("allergens_tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn nutriments(&self) -> Option<&Map<String, Value>> {
        self.0.get("nutriments").and_then(Value::as_object)
    }
}

// ---------------------------------------------------------------------------
// GET /product/{code}.json
// ---------------------------------------------------------------------------

/// Envelope returned by the product endpoint: `{ status, code, product? }`.
///
/// Unknown top-level keys are kept in `extra` so the envelope can be relayed
/// without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductEnvelope {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub status: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_verbose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductEnvelope {
    /// Reads `status` as a found flag. Accepts `0`/`1`, `"0"`/`"1"` and
    /// `"success"`/`"failure"`; anything else is `None`.
    #[must_use]
    pub fn status_flag(&self) -> Option<bool> {
        match &self.status {
            Value::Number(n) => match n.as_u64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim() {
                "1" | "success" => Some(true),
                "0" | "failure" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.status_flag() != Some(false) && self.product.is_some()
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_flag() == Some(false)
    }

    #[must_use]
    pub fn into_product(self) -> Option<ProductRecord> {
        if self.is_found() {
            self.product
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// GET /search
// ---------------------------------------------------------------------------

/// Envelope returned by the search endpoint: `{ count, page, page_size, products }`.
///
/// Upstream has sent the numeric fields both as numbers and as strings, so
/// they are parsed leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchEnvelope {
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub count: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchEnvelope {
    /// Converts the envelope into a page, falling back to the request for
    /// any pagination field upstream omitted.
    #[must_use]
    pub fn into_page(self, request: &SearchRequest) -> SearchResultPage {
        let item_count = self.products.len() as u64;
        SearchResultPage {
            total_count: self.count.unwrap_or(item_count),
            page: self
                .page
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(request.page),
            page_size: self
                .page_size
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(request.page_size),
            items: self.products,
        }
    }
}

/// One page of text-search results in upstream ranking order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResultPage {
    pub items: Vec<ProductRecord>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl SearchResultPage {
    /// `true` when upstream reported no matches at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() || self.total_count == 0
    }
}

/// Payload of a [`ProductQuery`] dispatched through `execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPayload {
    Product(ProductRecord),
    Page(SearchResultPage),
}

/// Error body served by `fydo-server`: `{ "error": { "code", "message" } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProxyErrorBody {
    pub error: ProxyErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProxyErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s.trim().parse::<u64>().map(Some).map_err(D::Error::custom),
    }
}
