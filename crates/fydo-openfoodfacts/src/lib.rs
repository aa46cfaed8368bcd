//! Product-data retrieval against the OpenFoodFacts REST API.
//!
//! [`ProductLookupClient`] issues barcode and text-search queries and folds
//! every result into a [`QueryOutcome`]. [`SearchAccumulation`] is the pure
//! "load more" reducer, [`QuerySurface`] applies last-write-wins cancellation,
//! and [`SearchSession`] composes the three for one search surface.

pub mod accumulate;
pub mod client;
pub mod error;
pub mod outcome;
pub mod session;
pub mod surface;
pub mod types;

pub use accumulate::SearchAccumulation;
pub use client::ProductLookupClient;
pub use error::LookupError;
pub use outcome::QueryOutcome;
pub use session::SearchSession;
pub use surface::QuerySurface;
pub use types::{
    ProductEnvelope, ProductQuery, ProductRecord, QueryPayload, SearchEnvelope, SearchRequest,
    SearchResultPage,
};
