//! JSON seed documents: either a bare array of products or an export object
//! with a top-level `products` array. Reviews without an id get a fresh one.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shopfront_core::Product;
use tracing::{debug, info};

#[derive(Deserialize)]
struct Export {
    products: Vec<Product>,
}

pub fn parse_seed(text: &str) -> Result<Vec<Product>> {
    let mut products = match text.trim_start().chars().next() {
        Some('[') => serde_json::from_str::<Vec<Product>>(text).context("parsing seed JSON array")?,
        Some('{') => serde_json::from_str::<Export>(text).context("parsing seed JSON export object")?.products,
        _ => bail!("seed must be a JSON array of products or an object with a `products` array"),
    };
    let mut assigned = 0usize;
    for p in products.iter_mut() {
        p.validate().with_context(|| format!("validating seed product {:?}", p.id))?;
        for r in p.reviews.iter_mut().filter(|r| r.id.trim().is_empty()) {
            r.id = uuid::Uuid::new_v4().to_string();
            assigned += 1;
        }
    }
    if assigned > 0 { debug!(reviews = assigned, "assigned ids to seed reviews"); }
    Ok(products)
}

pub fn load_seed(path: &Path) -> Result<Vec<Product>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading seed file {}", path.display()))?;
    let products = parse_seed(&text)?;
    info!(path = %path.display(), products = products.len(), "seed loaded");
    Ok(products)
}
