use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shopfront_core::Identity;
use tracing::debug;

use crate::{AuthError, IdentityVerifier};

type HmacSha256 = Hmac<Sha256>;

/// Signed token payload. `exp` is unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: i64,
}

impl Claims {
    pub fn new(email: impl Into<String>, name: Option<String>, ttl: Duration) -> Self {
        Self { email: email.into(), name, exp: (Utc::now() + ttl).timestamp() }
    }
}

/// Verifies `base64url(claims).base64url(hmac_sha256(secret, claims_part))` tokens.
///
/// Wire format: two unpadded base64url segments joined by `.`, the first being
/// the JSON [`Claims`] (`email`, optional `name`, `exp`). The format is not
/// versioned; any change to it invalidates every outstanding token, so tokens
/// from `shopfrontctl token mint` must be re-minted after upgrading across one.
/// Unknown claim fields are ignored when decoding.
pub struct HmacVerifier {
    secret: Vec<u8>,
}

impl HmacVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn mint(&self, claims: &Claims) -> Result<String, AuthError> {
        let json = serde_json::to_vec(claims).map_err(|e| AuthError::Unavailable(e.to_string()))?;
        let body = URL_SAFE_NO_PAD.encode(json);
        let sig = URL_SAFE_NO_PAD.encode(self.mac(&body)?.finalize().into_bytes());
        Ok(format!("{body}.{sig}"))
    }

    /// Check signature and expiry and return the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let (body, sig) = token.split_once('.').ok_or(AuthError::MalformedToken)?;
        let sig = URL_SAFE_NO_PAD.decode(sig).map_err(|_| AuthError::MalformedToken)?;
        self.mac(body)?.verify_slice(&sig).map_err(|_| AuthError::InvalidSignature)?;
        let json = URL_SAFE_NO_PAD.decode(body).map_err(|_| AuthError::MalformedToken)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| AuthError::MalformedToken)?;
        if claims.exp <= Utc::now().timestamp() {
            debug!(email = %claims.email, exp = claims.exp, "token expired");
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, body: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| AuthError::Unavailable(e.to_string()))?;
        mac.update(body.as_bytes());
        Ok(mac)
    }
}

#[async_trait]
impl IdentityVerifier for HmacVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode(token)?;
        Ok(Identity::new(claims.email, claims.name))
    }
}
