use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use shopfront_api::{ShopError, Storefront};
use shopfront_core::{ListingParams, ReviewInput};

use crate::auth::Caller;
use crate::error::ApiError;

type Shop = State<Arc<Storefront>>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewBody {
    review_id: Option<String>,
    rating: Option<Value>,
    comment: Option<String>,
}

impl ReviewBody {
    /// Ratings may arrive as numbers or numeric strings; range checks happen later.
    fn input(&self) -> ReviewInput {
        let rating = match self.rating.as_ref() {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        ReviewInput::new(rating, self.comment.clone().unwrap_or_default())
    }

    fn review_id(&self, fallback: Option<String>) -> Result<String, ApiError> {
        self.review_id
            .clone()
            .or(fallback)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ShopError::Validation("reviewId is required".into()).into())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewSelector {
    id: Option<String>,
}

// Bodies are parsed by hand so malformed JSON maps onto the `{"error"}` contract.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) { return Ok(T::default()); }
    serde_json::from_slice(body).map_err(|e| ShopError::Validation(format!("invalid JSON body: {e}")).into())
}

pub async fn list_products(
    State(shop): Shop,
    params: Result<Query<ListingParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let q = shop.parse_listing(&params)?;
    let page = shop.list_products(&q).await?;
    Ok(Json(page))
}

pub async fn product(State(shop): Shop, Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(shop.product(&id).await?))
}

pub async fn categories(State(shop): Shop) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(shop.categories().await?))
}

pub async fn add_review(
    State(shop): Shop,
    Path(id): Path<String>,
    Caller(who): Caller,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: ReviewBody = parse_body(&body)?;
    let review = shop.add_review(&who, &id, body.input().into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn edit_review(
    State(shop): Shop,
    Path(id): Path<String>,
    sel: Result<Query<ReviewSelector>, QueryRejection>,
    Caller(who): Caller,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: ReviewBody = parse_body(&body)?;
    let Query(sel) = sel?;
    let review_id = body.review_id(sel.id)?;
    let review = shop.edit_review(&who, &id, &review_id, body.input()).await?;
    Ok(Json(review))
}

pub async fn delete_review(
    State(shop): Shop,
    Path(id): Path<String>,
    sel: Result<Query<ReviewSelector>, QueryRejection>,
    Caller(who): Caller,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: ReviewBody = parse_body(&body)?;
    let Query(sel) = sel?;
    let review_id = body.review_id(sel.id)?;
    shop.delete_review(&who, &id, &review_id).await?;
    Ok(Json(serde_json::json!({ "message": "Review deleted successfully" })))
}
