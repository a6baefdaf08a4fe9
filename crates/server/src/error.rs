use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shopfront_api::ShopError;
use shopfront_core::{DocumentError, QueryError};
use tracing::error;

/// `ShopError` rendered as `{"error": "..."}` with the matching status.
#[derive(Debug)]
pub struct ApiError(pub ShopError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ShopError> for ApiError {
    fn from(e: ShopError) -> Self { Self(e) }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self { Self(e.into()) }
}

impl From<DocumentError> for ApiError {
    fn from(e: DocumentError) -> Self { Self(e.into()) }
}

// Query-string rejections would otherwise answer in plain text.
impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self { Self(ShopError::Validation(e.body_text())) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ShopError::Upstream(detail) = &self.0 {
            error!(error = %detail, "upstream failure");
            metrics::counter!("http_upstream_errors_total", 1u64);
        }
        let body = serde_json::json!({ "error": self.0.public_message() });
        (status, Json(body)).into_response()
    }
}
