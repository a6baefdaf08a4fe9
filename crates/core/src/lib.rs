//! Shopfront core types: products, reviews and caller identities.
//!
//! Everything here is plain data plus the pure helpers the listing pipeline
//! and the document stores share (validation, id normalization, ordering).

#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

pub mod query;

pub use query::{
    page_window, sort_products, ListingPage, ListingParams, ListingQuery, PageWindow, QueryError,
    SortField, SortOrder, DEFAULT_PAGE_SIZE,
};

/// Display name stored on reviews whose author has no name on record.
pub const ANONYMOUS: &str = "Anonymous";

/// Minimum width of a product document key; shorter ids are left-padded with `0`.
pub const PRODUCT_ID_WIDTH: usize = 3;

/// A catalog document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Product {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: SmallVec<[String; 4]>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: SmallVec<[String; 4]>,
    /// Oldest first.
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Document fields outside the storefront model (brand, thumbnail, ...), passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    /// Reject documents the pipeline cannot order or display sensibly.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.id.trim().is_empty() { return Err(DocumentError::EmptyId); }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DocumentError::InvalidPrice { id: self.id.clone(), price: self.price });
        }
        if !self.rating.is_finite() || !(0.0..=5.0).contains(&self.rating) {
            return Err(DocumentError::InvalidRating { id: self.id.clone(), rating: self.rating });
        }
        Ok(())
    }

    pub fn review(&self, review_id: &str) -> Option<&Review> {
        self.reviews.iter().find(|r| r.id == review_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Seed exports may omit it; the loader assigns one.
    #[serde(default)]
    pub id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub reviewer_email: String,
    #[serde(default = "anonymous")]
    pub reviewer_name: String,
    /// ISO-8601, refreshed on every edit.
    pub date: String,
}

impl Review {
    pub fn is_authored_by(&self, who: &Identity) -> bool {
        self.reviewer_email == who.email
    }
}

/// Rating and comment as submitted by a reviewer, already range checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: u8,
    pub comment: String,
}

impl ReviewDraft {
    /// Ratings arrive as JSON numbers; only whole values 1 through 5 are accepted.
    pub fn new(rating: f64, comment: impl Into<String>) -> Result<Self, DocumentError> {
        if rating.fract() != 0.0 || !(1.0..=5.0).contains(&rating) {
            return Err(DocumentError::InvalidReviewRating(rating));
        }
        Ok(Self { rating: rating as u8, comment: comment.into() })
    }
}

/// A review submission whose rating has not been checked yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewInput {
    pub rating: Option<f64>,
    pub comment: String,
}

impl ReviewInput {
    pub fn new(rating: Option<f64>, comment: impl Into<String>) -> Self {
        Self { rating, comment: comment.into() }
    }

    pub fn into_draft(self) -> Result<ReviewDraft, DocumentError> {
        let rating = self.rating.ok_or(DocumentError::MissingReviewRating)?;
        ReviewDraft::new(rating, self.comment)
    }
}

/// A caller whose bearer credential has been verified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Identity {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self { email: email.into(), name }
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n,
            _ => ANONYMOUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("product id must not be empty")]
    EmptyId,
    #[error("product {id}: price must be a non-negative number, got {price}")]
    InvalidPrice { id: String, price: f64 },
    #[error("product {id}: rating must be within 0..=5, got {rating}")]
    InvalidRating { id: String, rating: f64 },
    #[error("rating must be a whole number from 1 to 5, got {0}")]
    InvalidReviewRating(f64),
    #[error("rating must be a number from 1 to 5")]
    MissingReviewRating,
}

/// Left-pad a requested product id to the store's key width (`"7"` -> `"007"`).
pub fn normalize_product_id(raw: &str) -> String {
    format!("{:0>width$}", raw.trim(), width = PRODUCT_ID_WIDTH)
}

/// Distinct non-empty categories in first-seen order.
pub fn distinct_categories<'a, I>(products: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for p in products {
        if p.category.is_empty() { continue; }
        if seen.insert(p.category.as_str()) { out.push(p.category.clone()); }
    }
    out
}

fn anonymous() -> String { ANONYMOUS.to_string() }

// Seed exports carry numeric ids next to the zero-padded document keys.
fn id_from_string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId { Text(String), Number(u64) }
    Ok(match RawId::deserialize(de)? {
        RawId::Text(s) => s,
        RawId::Number(n) => normalize_product_id(&n.to_string()),
    })
}

pub mod prelude {
    pub use super::{
        DocumentError, Identity, ListingPage, ListingQuery, Product, Review, ReviewDraft, ReviewInput,
        SortField, SortOrder,
    };
}
