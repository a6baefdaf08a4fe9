//! Shopfront store: the document-store seam the pipeline reads through,
//! plus an in-RAM catalog implementation.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use shopfront_core::{
    distinct_categories, sort_products, DocumentError, ListingQuery, Product, Review, SortField,
    SortOrder,
};

pub mod memory;
pub mod seed;

pub use memory::{Catalog, CatalogBuilder, CatalogChange, MemoryStore};
pub use seed::{load_seed, parse_seed};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("product not found: {0}")]
    ProductNotFound(String),
    #[error("review not found: {0}")]
    ReviewNotFound(String),
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] DocumentError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter and ordering pushed down into the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreQuery {
    pub category: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl StoreQuery {
    pub fn matches(&self, p: &Product) -> bool {
        match self.category.as_deref() {
            Some(c) if !c.is_empty() => p.category == c,
            _ => true,
        }
    }

    /// Filter then stable-sort products given in store iteration order.
    pub fn apply<I>(&self, products: I) -> Vec<Product>
    where
        I: IntoIterator<Item = Product>,
    {
        let mut out: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        sort_products(&mut out, self.sort_by, self.order);
        out
    }
}

impl From<&ListingQuery> for StoreQuery {
    fn from(q: &ListingQuery) -> Self {
        Self { category: q.category_filter().map(str::to_string), sort_by: q.sort_by, order: q.order }
    }
}

/// Replacement rating/comment/timestamp for an existing review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPatch {
    pub rating: u8,
    pub comment: String,
    pub date: String,
}

/// Document store collaborator. Iteration order is document id ascending.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Category filter plus ordering; no pagination.
    async fn query(&self, q: &StoreQuery) -> StoreResult<Vec<Product>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Product>>;

    async fn list(&self) -> StoreResult<Vec<Product>>;

    async fn upsert(&self, product: Product) -> StoreResult<()>;

    /// Returns whether a document was removed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Append a review to a product document.
    async fn add_review(&self, product_id: &str, review: Review) -> StoreResult<Review>;

    async fn update_review(&self, product_id: &str, review_id: &str, patch: ReviewPatch) -> StoreResult<Review>;

    async fn delete_review(&self, product_id: &str, review_id: &str) -> StoreResult<()>;

    async fn categories(&self) -> StoreResult<Vec<String>> {
        let all = self.list().await?;
        Ok(distinct_categories(&all))
    }
}

// ---- document edits shared by store implementations ----

pub fn patch_review(product: &mut Product, review_id: &str, patch: ReviewPatch) -> StoreResult<Review> {
    let review = product
        .reviews
        .iter_mut()
        .find(|r| r.id == review_id)
        .ok_or_else(|| StoreError::ReviewNotFound(review_id.to_string()))?;
    review.rating = patch.rating;
    review.comment = patch.comment;
    review.date = patch.date;
    Ok(review.clone())
}

pub fn remove_review(product: &mut Product, review_id: &str) -> StoreResult<()> {
    let before = product.reviews.len();
    product.reviews.retain(|r| r.id != review_id);
    if product.reviews.len() == before {
        return Err(StoreError::ReviewNotFound(review_id.to_string()));
    }
    Ok(())
}
