use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use shopfront_api::Storefront;
use shopfront_core::Identity;
use tracing::debug;

use crate::error::ApiError;

/// Verified caller. Rejects with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

#[axum::async_trait]
impl FromRequestParts<Arc<Storefront>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, shop: &Arc<Storefront>) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        match shop.authenticate(header).await {
            Ok(who) => Ok(Caller(who)),
            Err(e) => {
                debug!(error = %e, path = %parts.uri.path(), "bearer rejected");
                Err(e.into())
            }
        }
    }
}
