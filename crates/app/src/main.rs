use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shopfront_app::{init_metrics, init_tracing, Config};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cfg = Config::parse();
    let shop = cfg.build().context("building storefront")?;
    let opts = shop.opts();
    info!(
        addr = %cfg.addr,
        db = ?cfg.db_path,
        seed = ?cfg.seed,
        threshold = opts.search.threshold,
        page_size = opts.default_page_size,
        "shopfront starting"
    );
    shopfront_server::serve(cfg.addr, Arc::new(shop)).await
}
