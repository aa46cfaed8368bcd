use std::time::Duration;

use thiserror::Error;

/// Errors produced while talking to the product-data API.
///
/// Public query operations never return these directly; they are folded into
/// a [`crate::QueryOutcome`]. The `fetch_*` methods on the client surface them
/// for callers that relay raw envelopes.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Caller error detected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request exceeded the configured timeout and was aborted.
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A relaying `fydo-server` could not reach upstream.
    #[error("upstream unreachable through proxy: {message}")]
    Unreachable { message: String },

    /// Upstream answered with a non-2xx status that carries no usable envelope.
    #[error("unexpected HTTP status {status} from {url}")]
    Upstream { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body parsed but contradicts itself (e.g. `status: 1` with no product).
    #[error("unexpected payload for {context}: {reason}")]
    UnexpectedPayload { context: String, reason: String },

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
