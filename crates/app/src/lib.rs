//! Shopfront wiring shared by the `shopfront` server and `shopfrontctl`:
//! configuration, tracing/metrics setup, and store/verifier construction.

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use shopfront_api::{Storefront, StorefrontOpts};
use shopfront_auth::{HmacVerifier, IdentityVerifier, StaticVerifier};
use shopfront_core::DEFAULT_PAGE_SIZE;
use shopfront_persist::SqliteStore;
use shopfront_search::{SearchOpts, DEFAULT_THRESHOLD};
use shopfront_store::{load_seed, DocumentStore, MemoryStore};
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "shopfront", version, about = "Shopfront storefront backend")]
pub struct Config {
    /// Listen address
    #[arg(long, env = "SHOPFRONT_ADDR", default_value = "0.0.0.0:3000")]
    pub addr: SocketAddr,

    /// JSON seed documents for the in-memory store
    #[arg(long, env = "SHOPFRONT_SEED")]
    pub seed: Option<PathBuf>,

    /// SQLite database; takes precedence over the in-memory store
    #[arg(long = "db", env = "SHOPFRONT_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// HMAC secret for signed bearer tokens
    #[arg(long, env = "SHOPFRONT_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// JSON token table for static bearer tokens
    #[arg(long, env = "SHOPFRONT_TOKENS")]
    pub tokens: Option<PathBuf>,

    /// Search looseness cut-off, 0 (exact) to 1 (anything)
    #[arg(long, env = "SHOPFRONT_SEARCH_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub search_threshold: f32,

    /// Page size when the request has no `limit`
    #[arg(long, env = "SHOPFRONT_DEFAULT_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub default_page_size: u32,
}

impl Config {
    pub fn storefront_opts(&self) -> Result<StorefrontOpts> {
        if !(0.0..=1.0).contains(&self.search_threshold) {
            bail!("search threshold must be within 0..=1, got {}", self.search_threshold);
        }
        if self.default_page_size == 0 {
            bail!("default page size must be positive");
        }
        Ok(StorefrontOpts {
            search: SearchOpts { threshold: self.search_threshold },
            default_page_size: self.default_page_size,
        })
    }

    pub fn build(&self) -> Result<Storefront> {
        let opts = self.storefront_opts()?;
        let store = open_store(self.seed.as_deref(), self.db_path.as_deref())?;
        let verifier = open_verifier(self.auth_secret.as_deref(), self.tokens.as_deref())?;
        Ok(Storefront::new(store, verifier).with_opts(opts))
    }
}

pub fn init_tracing() {
    let env = std::env::var("SHOPFRONT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

pub fn init_metrics() {
    if let Ok(addr) = std::env::var("SHOPFRONT_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid SHOPFRONT_METRICS_ADDR; expected host:port");
        }
    }
}

/// SQLite when `db` is given (seeded from `seed` if the table is empty),
/// otherwise an in-memory catalog from `seed`, otherwise an empty catalog.
pub fn open_store(seed: Option<&Path>, db: Option<&Path>) -> Result<Arc<dyn DocumentStore>> {
    if let Some(db) = db {
        let store = SqliteStore::open(db)?;
        if let Some(seed) = seed {
            if store.count()? == 0 {
                let n = store.import(load_seed(seed)?).context("importing seed into sqlite")?;
                info!(products = n, "empty database seeded");
            }
        }
        metrics::gauge!("catalog_products", store.count()? as f64);
        return Ok(Arc::new(store));
    }
    let products = match seed {
        Some(seed) => load_seed(seed)?,
        None => {
            warn!("no seed or database configured; serving an empty catalog");
            Vec::new()
        }
    };
    metrics::gauge!("catalog_products", products.len() as f64);
    let store = MemoryStore::from_products(products).context("building in-memory catalog")?;
    Ok(Arc::new(store))
}

/// Exactly one of `secret` or `tokens` must be set.
pub fn open_verifier(secret: Option<&str>, tokens: Option<&Path>) -> Result<Arc<dyn IdentityVerifier>> {
    match (secret.filter(|s| !s.is_empty()), tokens) {
        (Some(secret), None) => {
            info!("bearer tokens verified by HMAC");
            Ok(Arc::new(HmacVerifier::new(secret)))
        }
        (None, Some(path)) => Ok(Arc::new(StaticVerifier::from_json_file(path)?)),
        (Some(_), Some(_)) => bail!("configure either SHOPFRONT_AUTH_SECRET or SHOPFRONT_TOKENS, not both"),
        (None, None) => bail!("no identity verifier configured; set SHOPFRONT_AUTH_SECRET or SHOPFRONT_TOKENS"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"[{"id":"001","title":"Apple","category":"groceries","price":1.5}]"#;

    #[test]
    fn config_defaults_and_bounds() {
        let cfg = Config::try_parse_from(["shopfront", "--auth-secret", "k"]).unwrap();
        assert_eq!(cfg.addr.port(), 3000);
        let opts = cfg.storefront_opts().unwrap();
        assert_eq!(opts.default_page_size, 20);
        assert!((opts.search.threshold - 0.3).abs() < f32::EPSILON);

        let cfg = Config::try_parse_from(["shopfront", "--search-threshold", "1.5"]).unwrap();
        assert!(cfg.storefront_opts().is_err());
    }

    #[test]
    fn verifier_requires_exactly_one_source() {
        assert!(open_verifier(Some("k"), None).is_ok());
        assert!(open_verifier(None, None).is_err());
        assert!(open_verifier(Some("k"), Some(Path::new("tokens.json"))).is_err());
    }

    #[tokio::test]
    async fn sqlite_is_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("seed.json");
        std::fs::write(&seed, SEED).unwrap();
        let db = dir.path().join("shop.db");

        let store = open_store(Some(seed.as_path()), Some(db.as_path())).unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        drop(store);

        std::fs::write(&seed, "[]").unwrap();
        let store = open_store(Some(seed.as_path()), Some(db.as_path())).unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        let mem = open_store(None, None).unwrap();
        assert!(mem.list().await.unwrap().is_empty());
    }
}
