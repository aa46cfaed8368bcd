//! `search` command: accumulate one or more pages of text-search results.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context;
use fydo_openfoodfacts::{
    ProductLookupClient, QueryOutcome, SearchAccumulation, SearchResultPage, SearchSession,
};

use crate::describe_failure;

/// Runs a new search for `term`, then up to `pages - 1` load-more steps,
/// and prints the accumulated results.
///
/// Stops early once every match has been gathered or a page fails. The
/// returned outcome is the last page's; items gathered before a failure
/// are still printed.
///
/// # Errors
///
/// Returns an error if a query is superseded, which only happens if the
/// session is shared, or if `--json` serialization fails.
pub(crate) async fn run_search(
    client: Arc<ProductLookupClient>,
    term: &str,
    pages: u32,
    page_size: u32,
    json: bool,
) -> anyhow::Result<QueryOutcome<SearchResultPage>> {
    let session = SearchSession::new(client, page_size);

    let mut last = session
        .submit(term)
        .await
        .context("search was superseded")?;
    for _ in 1..pages {
        if !last.is_success() || !session.snapshot().has_more() {
            break;
        }
        last = session
            .load_more()
            .await
            .context("load more was superseded")?;
    }

    let acc = session.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&acc)?);
    } else if acc.is_empty() && !last.is_failure() {
        println!("no products match \"{}\"", term.trim());
    } else {
        print!("{}", format_accumulation(&acc));
    }
    if last.is_failure() {
        eprintln!("search failed: {}", describe_failure(&last));
    }

    Ok(last)
}

/// Numbered result list followed by a "showing N of M" footer.
pub(crate) fn format_accumulation(acc: &SearchAccumulation) -> String {
    let mut out = String::new();
    for (idx, product) in acc.items().iter().enumerate() {
        let code = product.code().unwrap_or_else(|| "-".to_owned());
        let name = product.product_name().unwrap_or("(unnamed product)");
        let _ = write!(out, "{:>4}. {code:<14} {name}", idx + 1);
        if let Some(brands) = product.brands() {
            let _ = write!(out, " ({brands})");
        }
        out.push('\n');
    }

    let _ = write!(
        out,
        "showing {} of {} results for \"{}\"",
        acc.len(),
        acc.total_count(),
        acc.term().unwrap_or_default()
    );
    if acc.has_more() {
        let _ = write!(out, "; more available from page {}", acc.next_page());
    }
    out.push('\n');
    out
}
