//! Shopfront API façade (in-process).
//!
//! `Storefront` is what frontends (HTTP server, CLI) depend on. It owns no
//! globals: the document store and the identity verifier are injected by the
//! binary that builds it.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use shopfront_auth::{AuthError, IdentityVerifier};
use shopfront_core::{
    normalize_product_id, DocumentError, Identity, ListingPage, ListingParams, ListingQuery, Product,
    QueryError, Review, ReviewDraft, ReviewInput, DEFAULT_PAGE_SIZE,
};
use shopfront_search::SearchOpts;
use shopfront_store::{DocumentStore, StoreError};
use tracing::info;

pub mod listing;
mod reviews;

pub use listing::ListingExplain;

pub const PRODUCT_NOT_FOUND: &str = "Product not found";
pub const REVIEW_NOT_FOUND: &str = "Review not found";
pub const UNAUTHORIZED: &str = "Unauthorized";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// API errors. Display text is safe to show callers, except `Upstream`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShopError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("upstream: {0}")]
    Upstream(String),
}

impl ShopError {
    /// Message for response bodies; upstream detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ShopError::Upstream(_) => INTERNAL_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

pub type ShopResult<T> = Result<T, ShopError>;

impl From<StoreError> for ShopError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProductNotFound(_) => ShopError::NotFound(PRODUCT_NOT_FOUND.into()),
            StoreError::ReviewNotFound(_) => ShopError::NotFound(REVIEW_NOT_FOUND.into()),
            StoreError::InvalidDocument(d) => ShopError::Validation(d.to_string()),
            StoreError::Unavailable(m) => ShopError::Upstream(m),
            StoreError::Backend(e) => ShopError::Upstream(format!("{e:#}")),
        }
    }
}

impl From<AuthError> for ShopError {
    fn from(e: AuthError) -> Self {
        if e.is_rejection() { ShopError::Unauthorized(UNAUTHORIZED.into()) } else { ShopError::Upstream(e.to_string()) }
    }
}

impl From<QueryError> for ShopError {
    fn from(e: QueryError) -> Self { ShopError::Validation(e.to_string()) }
}

impl From<DocumentError> for ShopError {
    fn from(e: DocumentError) -> Self { ShopError::Validation(e.to_string()) }
}

#[derive(Debug, Clone, Copy)]
pub struct StorefrontOpts {
    pub search: SearchOpts,
    pub default_page_size: u32,
}

impl Default for StorefrontOpts {
    fn default() -> Self { Self { search: SearchOpts::default(), default_page_size: DEFAULT_PAGE_SIZE } }
}

pub struct Storefront {
    store: Arc<dyn DocumentStore>,
    verifier: Arc<dyn IdentityVerifier>,
    opts: StorefrontOpts,
}

impl Storefront {
    pub fn new(store: Arc<dyn DocumentStore>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { store, verifier, opts: StorefrontOpts::default() }
    }

    pub fn with_opts(mut self, opts: StorefrontOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn opts(&self) -> StorefrontOpts { self.opts }

    pub fn store(&self) -> &Arc<dyn DocumentStore> { &self.store }

    /// Parse raw query-string parameters with this storefront's default page size.
    pub fn parse_listing(&self, params: &ListingParams) -> ShopResult<ListingQuery> {
        Ok(params.parse(self.opts.default_page_size)?)
    }

    pub async fn list_products(&self, q: &ListingQuery) -> ShopResult<ListingPage> {
        Ok(self.list_products_explain(q).await?.0)
    }

    /// Listing plus per-stage counts, for `--explain` style output.
    pub async fn list_products_explain(&self, q: &ListingQuery) -> ShopResult<(ListingPage, ListingExplain)> {
        let t0 = Instant::now();
        info!(page = q.page, limit = q.page_size, sort_by = q.sort_by.as_str(), order = q.order.as_str(), category = ?q.category_filter(), search = ?q.search_term(), "api: list_products start");
        let (page, explain) = listing::run(self.store.as_ref(), q, self.opts.search).await?;
        info!(returned = page.products.len(), total = page.total_products, took_ms = %t0.elapsed().as_millis(), "api: list_products ok");
        Ok((page, explain))
    }

    pub async fn product(&self, raw_id: &str) -> ShopResult<Product> {
        let t0 = Instant::now();
        let id = normalize_product_id(raw_id);
        let product = self.store.get(&id).await?.ok_or_else(|| ShopError::NotFound(PRODUCT_NOT_FOUND.into()))?;
        info!(id = %id, reviews = product.reviews.len(), took_ms = %t0.elapsed().as_millis(), "api: product ok");
        Ok(product)
    }

    pub async fn categories(&self) -> ShopResult<Vec<String>> {
        let t0 = Instant::now();
        let cats = self.store.categories().await?;
        info!(count = cats.len(), took_ms = %t0.elapsed().as_millis(), "api: categories ok");
        Ok(cats)
    }

    /// Verify an `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> ShopResult<Identity> {
        Ok(shopfront_auth::authenticate(self.verifier.as_ref(), header).await?)
    }

    pub async fn add_review(&self, who: &Identity, raw_id: &str, draft: ReviewDraft) -> ShopResult<Review> {
        reviews::add(self, who, raw_id, draft).await
    }

    /// The rating is checked only once the caller is known to own the review.
    pub async fn edit_review(&self, who: &Identity, raw_id: &str, review_id: &str, input: ReviewInput) -> ShopResult<Review> {
        reviews::edit(self, who, raw_id, review_id, input).await
    }

    pub async fn delete_review(&self, who: &Identity, raw_id: &str, review_id: &str) -> ShopResult<()> {
        reviews::delete(self, who, raw_id, review_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_detail_is_not_public() {
        let e: ShopError = StoreError::Unavailable("db down at 10.0.0.3".into()).into();
        assert_eq!(e.public_message(), INTERNAL_ERROR);
        let e: ShopError = StoreError::ReviewNotFound("r1".into()).into();
        assert_eq!(e.public_message(), REVIEW_NOT_FOUND);
    }

    #[test]
    fn auth_failures_split_by_cause() {
        assert_eq!(ShopError::from(AuthError::Expired), ShopError::Unauthorized(UNAUTHORIZED.into()));
        assert!(matches!(ShopError::from(AuthError::Unavailable("idp".into())), ShopError::Upstream(_)));
    }
}
