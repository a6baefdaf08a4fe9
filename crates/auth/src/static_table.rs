use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use shopfront_core::Identity;
use tracing::info;

use crate::{AuthError, IdentityVerifier};

/// Fixed token -> identity table, e.g. `{"tok-ann": {"email": "ann@x.io", "name": "Ann"}}`.
#[derive(Debug, Default, Clone)]
pub struct StaticVerifier {
    tokens: FxHashMap<String, Identity>,
}

impl StaticVerifier {
    pub fn empty() -> Self { Self::default() }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Identity)>,
    {
        Self { tokens: entries.into_iter().collect() }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading token table {}", path.display()))?;
        let tokens: FxHashMap<String, Identity> =
            serde_json::from_str(&text).with_context(|| format!("parsing token table {}", path.display()))?;
        info!(path = %path.display(), tokens = tokens.len(), "static token table loaded");
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize { self.tokens.len() }
    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::UnknownToken)
    }
}
