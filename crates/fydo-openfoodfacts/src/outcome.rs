//! Terminal states of a product query.

use crate::error::LookupError;

/// The single value every query resolves to.
///
/// `NotFound` is a valid negative answer (unknown barcode, search with no
/// matches), distinct from every transport or upstream failure.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    Success(T),
    NotFound,
    /// Rejected before any request was sent.
    InvalidInput(String),
    Timeout,
    NetworkError(String),
    UpstreamError(u16),
    /// 2xx response whose body was not the expected JSON shape.
    MalformedResponse(String),
}

impl<T> QueryOutcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryOutcome::NotFound)
    }

    /// `true` for outcomes that indicate something went wrong, as opposed to
    /// a successful or empty answer.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, QueryOutcome::Success(_) | QueryOutcome::NotFound)
    }

    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            QueryOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> QueryOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            QueryOutcome::Success(value) => QueryOutcome::Success(f(value)),
            QueryOutcome::NotFound => QueryOutcome::NotFound,
            QueryOutcome::InvalidInput(reason) => QueryOutcome::InvalidInput(reason),
            QueryOutcome::Timeout => QueryOutcome::Timeout,
            QueryOutcome::NetworkError(message) => QueryOutcome::NetworkError(message),
            QueryOutcome::UpstreamError(status) => QueryOutcome::UpstreamError(status),
            QueryOutcome::MalformedResponse(message) => QueryOutcome::MalformedResponse(message),
        }
    }

    /// Stable snake_case label, used in logs and CLI output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            QueryOutcome::Success(_) => "success",
            QueryOutcome::NotFound => "not_found",
            QueryOutcome::InvalidInput(_) => "invalid_input",
            QueryOutcome::Timeout => "timeout",
            QueryOutcome::NetworkError(_) => "network_error",
            QueryOutcome::UpstreamError(_) => "upstream_error",
            QueryOutcome::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl<T> From<LookupError> for QueryOutcome<T> {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidInput(reason) => QueryOutcome::InvalidInput(reason),
            LookupError::Timeout { .. } => QueryOutcome::Timeout,
            LookupError::Http(e) if e.is_timeout() => QueryOutcome::Timeout,
            LookupError::Http(e) => QueryOutcome::NetworkError(e.to_string()),
            LookupError::Unreachable { message } => QueryOutcome::NetworkError(message),
            LookupError::Upstream { status, .. } => QueryOutcome::UpstreamError(status),
            err @ (LookupError::Deserialize { .. } | LookupError::UnexpectedPayload { .. }) => {
                QueryOutcome::MalformedResponse(err.to_string())
            }
            err @ LookupError::InvalidBaseUrl { .. } => QueryOutcome::InvalidInput(err.to_string()),
        }
    }
}
