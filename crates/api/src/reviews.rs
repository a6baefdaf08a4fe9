use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use shopfront_core::{normalize_product_id, Identity, Review, ReviewDraft, ReviewInput};
use shopfront_store::ReviewPatch;
use tracing::{info, warn};

use crate::{ShopError, ShopResult, Storefront, PRODUCT_NOT_FOUND, REVIEW_NOT_FOUND};

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) async fn add(shop: &Storefront, who: &Identity, raw_id: &str, draft: ReviewDraft) -> ShopResult<Review> {
    let t0 = Instant::now();
    let product_id = normalize_product_id(raw_id);
    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        rating: draft.rating,
        comment: draft.comment,
        reviewer_email: who.email.clone(),
        reviewer_name: who.display_name().to_string(),
        date: now_iso(),
    };
    let saved = shop.store.add_review(&product_id, review).await?;
    info!(product = %product_id, review = %saved.id, took_ms = %t0.elapsed().as_millis(), "api: add_review ok");
    Ok(saved)
}

pub(crate) async fn edit(shop: &Storefront, who: &Identity, raw_id: &str, review_id: &str, input: ReviewInput) -> ShopResult<Review> {
    let t0 = Instant::now();
    let product_id = normalize_product_id(raw_id);
    owned_review(shop, who, &product_id, review_id, "edit").await?;
    let draft = input.into_draft()?;
    let patch = ReviewPatch { rating: draft.rating, comment: draft.comment, date: now_iso() };
    let updated = shop.store.update_review(&product_id, review_id, patch).await?;
    info!(product = %product_id, review = %review_id, took_ms = %t0.elapsed().as_millis(), "api: edit_review ok");
    Ok(updated)
}

pub(crate) async fn delete(shop: &Storefront, who: &Identity, raw_id: &str, review_id: &str) -> ShopResult<()> {
    let t0 = Instant::now();
    let product_id = normalize_product_id(raw_id);
    owned_review(shop, who, &product_id, review_id, "delete").await?;
    shop.store.delete_review(&product_id, review_id).await?;
    info!(product = %product_id, review = %review_id, took_ms = %t0.elapsed().as_millis(), "api: delete_review ok");
    Ok(())
}

// Existence first (404), then authorship (403).
async fn owned_review(shop: &Storefront, who: &Identity, product_id: &str, review_id: &str, action: &str) -> ShopResult<Review> {
    if review_id.trim().is_empty() {
        return Err(ShopError::Validation("reviewId is required".into()));
    }
    let product = shop.store.get(product_id).await?.ok_or_else(|| ShopError::NotFound(PRODUCT_NOT_FOUND.into()))?;
    let review = product.review(review_id).cloned().ok_or_else(|| ShopError::NotFound(REVIEW_NOT_FOUND.into()))?;
    if !review.is_authored_by(who) {
        warn!(product = %product_id, review = %review_id, caller = %who.email, "review ownership mismatch");
        return Err(ShopError::Forbidden(format!("Not authorized to {action} this review")));
    }
    Ok(review)
}
