//! "Load more" accumulation of text-search pages.
//!
//! [`SearchAccumulation::reduce`] is a pure transition from the current state,
//! the request that was sent and its outcome to the next state. It never
//! performs I/O, so the pagination rules can be tested without a server.

use serde::Serialize;

use crate::outcome::QueryOutcome;
use crate::types::{ProductRecord, SearchRequest, SearchResultPage};

/// Items gathered so far for one search term.
///
/// Items are append-only across pages and kept in upstream order; the same
/// product appearing on two pages is kept twice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchAccumulation {
    term: Option<String>,
    items: Vec<ProductRecord>,
    next_page: u32,
    total_count: u64,
}

impl Default for SearchAccumulation {
    fn default() -> Self {
        Self {
            term: None,
            items: Vec::new(),
            next_page: 1,
            total_count: 0,
        }
    }
}

impl SearchAccumulation {
    /// Empty accumulation for `term`, before its first page arrives.
    pub(crate) fn fresh(term: &str) -> Self {
        Self {
            term: Some(term.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    #[must_use]
    pub fn items(&self) -> &[ProductRecord] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// `true` while upstream reported more matches than have been gathered.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.term.is_some() && (self.items.len() as u64) < self.total_count
    }

    /// The request that would fetch the next page, or `None` when there is
    /// no active term or nothing left to load.
    #[must_use]
    pub fn next_request(&self, page_size: u32) -> Option<SearchRequest> {
        if !self.has_more() {
            return None;
        }
        let term = self.term.as_deref()?;
        Some(SearchRequest::new(term, self.next_page, page_size))
    }

    /// Applies the outcome of `request` to this accumulation.
    ///
    /// - `page == 1` starts over for the request's term, dropping every item
    ///   of the previous term.
    /// - `page == next_page` with the same term appends.
    /// - Any other request is stale and leaves the state untouched, as does
    ///   [`QueryOutcome::InvalidInput`] (no query was sent).
    ///
    /// A successful page appends its items and advances `next_page`. An empty
    /// result marks the search exhausted. Failures keep the base state: empty
    /// for a new term, unchanged for a load-more.
    #[must_use]
    pub fn reduce(
        self,
        request: &SearchRequest,
        outcome: &QueryOutcome<SearchResultPage>,
    ) -> Self {
        if matches!(outcome, QueryOutcome::InvalidInput(_)) {
            return self;
        }

        let mut next = if request.page == 1 {
            Self::fresh(request.term())
        } else if self.term() == Some(request.term()) && request.page == self.next_page {
            self
        } else {
            return self;
        };

        match outcome {
            QueryOutcome::Success(page) => {
                next.items.extend(page.items.iter().cloned());
                next.total_count = page.total_count.max(next.items.len() as u64);
                next.next_page = request.page.saturating_add(1);
            }
            QueryOutcome::NotFound => {
                next.total_count = next.items.len() as u64;
            }
            _ => {}
        }

        next
    }
}
