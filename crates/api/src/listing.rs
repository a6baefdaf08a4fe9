//! The listing query pipeline: filter -> sort -> fuzzy search -> paginate.
//! Filter and sort are pushed into the store; search and pagination run here
//! over the whole ordered set, so totals reflect every match.

use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use shopfront_core::{ListingPage, ListingQuery};
use shopfront_search::{rank_by_title, SearchDebugInfo, SearchOpts};
use shopfront_store::{DocumentStore, StoreQuery};
use tracing::debug;

use crate::ShopResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingExplain {
    pub query: ListingQuery,
    /// Products left after the category filter.
    pub filtered: usize,
    /// Present when a search term was applied.
    pub search: Option<SearchDebugInfo>,
    pub took_ms: u64,
}

pub async fn run(store: &dyn DocumentStore, q: &ListingQuery, opts: SearchOpts) -> ShopResult<(ListingPage, ListingExplain)> {
    let started = Instant::now();
    counter!("listing_queries_total", 1u64);

    let ordered = store.query(&StoreQuery::from(q)).await?;
    let filtered = ordered.len();

    let (results, search) = match q.search_term() {
        Some(term) => {
            let (ranked, dbg) = rank_by_title(ordered, term, opts, |p| p.title.as_str());
            (ranked, Some(dbg))
        }
        None => (ordered, None),
    };

    let page = ListingPage::from_results(results, q.page, q.page_size);
    let took = started.elapsed();
    histogram!("listing_eval_ms", took.as_secs_f64() * 1000.0);
    debug!(filtered, searched = page.total_products, returned = page.products.len(), total_pages = page.total_pages, "listing stages");

    let explain = ListingExplain {
        query: q.clone(),
        filtered,
        search,
        took_ms: u64::try_from(took.as_millis()).unwrap_or(u64::MAX),
    };
    Ok((page, explain))
}
