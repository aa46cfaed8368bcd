//! One search surface: new searches, "load more", and drill-down.

use std::sync::Arc;

use crate::accumulate::SearchAccumulation;
use crate::client::ProductLookupClient;
use crate::outcome::QueryOutcome;
use crate::surface::QuerySurface;
use crate::types::{ProductRecord, SearchRequest, SearchResultPage};

/// Search state for a single UI surface.
///
/// Results and product detail live on separate [`QuerySurface`]s: a
/// drill-down never cancels or mutates the search it came from, and a new
/// search never cancels an open detail lookup.
pub struct SearchSession {
    client: Arc<ProductLookupClient>,
    page_size: u32,
    results: QuerySurface<SearchAccumulation>,
    detail: QuerySurface<Option<QueryOutcome<ProductRecord>>>,
}

impl SearchSession {
    /// A zero `page_size` is raised to 1.
    #[must_use]
    pub fn new(client: Arc<ProductLookupClient>, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            results: QuerySurface::default(),
            detail: QuerySurface::default(),
        }
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Starts a new search for `term`, replacing whatever was accumulated.
    ///
    /// The previous term's items are dropped as soon as the search starts,
    /// not when its first page arrives. A blank term resolves to
    /// [`QueryOutcome::InvalidInput`] and leaves the surface alone, including
    /// any query already in flight. Returns `None` when a newer query on this
    /// surface superseded this one.
    pub async fn submit(&self, term: &str) -> Option<QueryOutcome<SearchResultPage>> {
        let request = SearchRequest::first_page(term, self.page_size);
        if let Err(err) = request.validate() {
            return Some(err.into());
        }
        let fresh = SearchAccumulation::fresh(request.term());
        self.run(request, |acc| *acc = fresh).await
    }

    /// Fetches the next page of the current search and appends it.
    ///
    /// Without an active search, or while its first page is still loading,
    /// this is [`QueryOutcome::InvalidInput`]; once every match has been
    /// gathered it is [`QueryOutcome::NotFound`]. None of these cases sends a
    /// request or disturbs the query in flight.
    pub async fn load_more(&self) -> Option<QueryOutcome<SearchResultPage>> {
        let (has_term, first_page_pending, next) = self.results.with_visible(|acc| {
            (
                acc.term().is_some(),
                acc.next_page() == 1,
                acc.next_request(self.page_size),
            )
        });

        if has_term && first_page_pending && self.results.is_pending() {
            return Some(QueryOutcome::InvalidInput(
                "search is still loading its first page".to_owned(),
            ));
        }

        match next {
            Some(request) => self.run(request, |_| {}).await,
            None if has_term => Some(QueryOutcome::NotFound),
            None => Some(QueryOutcome::InvalidInput(
                "no search to continue".to_owned(),
            )),
        }
    }

    /// Looks up one product from the result list.
    ///
    /// Returns `None` when a newer selection superseded this one.
    pub async fn select(&self, code: &str) -> Option<QueryOutcome<ProductRecord>> {
        self.detail
            .run(self.client.select_by_identifier(code), |selected, outcome| {
                *selected = Some(outcome.clone());
                outcome
            })
            .await
    }

    /// Copy of the current accumulation.
    #[must_use]
    pub fn snapshot(&self) -> SearchAccumulation {
        self.results.with_visible(Clone::clone)
    }

    /// Outcome of the most recent completed selection.
    #[must_use]
    pub fn selection(&self) -> Option<QueryOutcome<ProductRecord>> {
        self.detail.with_visible(Clone::clone)
    }

    /// Cancels every in-flight query on this session.
    pub fn cancel(&self) {
        self.results.cancel();
        self.detail.cancel();
    }

    async fn run(
        &self,
        request: SearchRequest,
        prepare: impl FnOnce(&mut SearchAccumulation),
    ) -> Option<QueryOutcome<SearchResultPage>> {
        tracing::debug!(term = request.term(), page = request.page, "search page requested");
        self.results
            .run_prepared(prepare, self.client.search(&request), |acc, outcome| {
                *acc = std::mem::take(acc).reduce(&request, &outcome);
                outcome
            })
            .await
    }
}
