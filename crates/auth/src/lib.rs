//! Shopfront auth: turns an `Authorization: Bearer ...` header into a verified
//! caller identity.
//!
//! Account flows live with the identity provider; this crate only verifies.
//! Two verifiers are provided: HMAC-signed self-contained tokens and a fixed
//! token table loaded from JSON.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use shopfront_core::Identity;

mod hmac_token;
mod static_table;

pub use hmac_token::{Claims, HmacVerifier};
pub use static_table::StaticVerifier;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed bearer token")]
    MalformedToken,
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("unknown token")]
    UnknownToken,
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Failures caused by the credential itself, as opposed to the verifier.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AuthError::Unavailable(_))
    }
}

/// Identity verification collaborator.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Extract the token from an `Authorization` header value. The scheme is case-insensitive.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let raw = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(AuthError::MissingToken)?;
    let (scheme, token) = raw.split_once(' ').ok_or(AuthError::MalformedToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") { return Err(AuthError::MalformedToken); }
    let token = token.trim();
    if token.is_empty() { return Err(AuthError::MissingToken); }
    Ok(token)
}

/// Guard: header in, identity out.
pub async fn authenticate(verifier: &dyn IdentityVerifier, header: Option<&str>) -> Result<Identity, AuthError> {
    let token = bearer_token(header)?;
    verifier.verify(token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(bearer_token(Some("bearer   tok ")), Ok("tok"));
        assert_eq!(bearer_token(None), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("  ")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthError::MalformedToken));
        assert_eq!(bearer_token(Some("Basic dXNlcg==")), Err(AuthError::MalformedToken));
        assert_eq!(bearer_token(Some("tok")), Err(AuthError::MalformedToken));
    }
}
