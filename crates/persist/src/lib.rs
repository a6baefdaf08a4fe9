//! Shopfront persistence: SQLite-backed document store.
//! One row per product: sortable columns next to the full JSON document.

#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use shopfront_core::{Product, Review};
use shopfront_store::{
    patch_review, remove_review, DocumentStore, ReviewPatch, StoreError, StoreQuery, StoreResult,
};
use tracing::{debug, info};

/// SQLite-backed store. Synchronous under the hood; calls are short.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Connection::open(path).with_context(|| format!("opening sqlite db at {}", path.display()))?;
        db.pragma_update(None, "journal_mode", "WAL").ok();
        db.pragma_update(None, "synchronous", "NORMAL").ok();
        let me = Self::init(db)?;
        info!(path = %path.display(), "sqlite store opened");
        Ok(me)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("opening in-memory sqlite db")?)
    }

    fn init(db: Connection) -> Result<Self> {
        let started = Instant::now();
        db.execute(
            "CREATE TABLE IF NOT EXISTS products (
                id       TEXT PRIMARY KEY NOT NULL,
                title    TEXT NOT NULL,
                price    REAL NOT NULL,
                category TEXT NOT NULL,
                rating   REAL NOT NULL,
                stock    INTEGER NOT NULL,
                doc      TEXT NOT NULL
            )",
            [],
        )
        .context("creating products table")?;
        db.execute("CREATE INDEX IF NOT EXISTS idx_products_category ON products(category, id)", [])
            .context("creating category index")?;
        histogram!("persist_open_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(Self { db: Mutex::new(db) })
    }

    /// Upsert a batch in one transaction. Any invalid document aborts the whole import.
    pub fn import(&self, products: Vec<Product>) -> StoreResult<usize> {
        let started = Instant::now();
        for p in products.iter() { p.validate()?; }
        let mut db = self.conn()?;
        let tx = db.transaction().context("beginning import")?;
        for p in products.iter() { write_doc(&tx, p)?; }
        tx.commit().context("committing import")?;
        histogram!("persist_import_ms", started.elapsed().as_secs_f64() * 1000.0);
        info!(products = products.len(), "sqlite import ok");
        Ok(products.len())
    }

    pub fn count(&self) -> StoreResult<usize> {
        let db = self.conn()?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0)).context("counting products")?;
        Ok(n.max(0) as usize)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::Unavailable("sqlite connection poisoned".into()))
    }

    fn select(&self, q: &StoreQuery) -> StoreResult<Vec<Product>> {
        let started = Instant::now();
        let category = q.category.as_deref().filter(|c| !c.is_empty());
        // Column names come from the closed SortField set, never from caller text.
        let sql = format!(
            "SELECT id, doc FROM products {} ORDER BY {} {}, id ASC",
            if category.is_some() { "WHERE category = ?1" } else { "" },
            q.sort_by.as_str(),
            q.order.as_str(),
        );
        let db = self.conn()?;
        let mut stmt = db.prepare(&sql).context("preparing product query")?;
        let rows = stmt
            .query_map(params_from_iter(category), |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))
            .context("running product query")?;
        let mut out = Vec::new();
        for row in rows {
            let (id, doc) = row.context("reading product row")?;
            out.push(decode(&id, &doc)?);
        }
        histogram!("persist_query_ms", started.elapsed().as_secs_f64() * 1000.0);
        debug!(sql = %sql, rows = out.len(), "sqlite query");
        Ok(out)
    }

    fn fetch(&self, id: &str) -> StoreResult<Option<Product>> {
        let started = Instant::now();
        let db = self.conn()?;
        let found = read_doc(&db, id)?;
        histogram!("persist_get_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(found)
    }

    fn put(&self, product: &Product) -> StoreResult<()> {
        let started = Instant::now();
        product.validate()?;
        let db = self.conn()?;
        write_doc(&db, product)?;
        histogram!("persist_put_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("persist_put_total", 1u64);
        Ok(())
    }

    fn remove(&self, id: &str) -> StoreResult<bool> {
        let db = self.conn()?;
        let n = db.execute("DELETE FROM products WHERE id = ?1", [id]).context("deleting product")?;
        Ok(n > 0)
    }

    // Read-modify-write of one document; the edit's error rolls the transaction back.
    fn edit<T>(&self, id: &str, edit: impl FnOnce(&mut Product) -> StoreResult<T>) -> StoreResult<T> {
        let started = Instant::now();
        let mut db = self.conn()?;
        let tx = db.transaction().context("beginning document edit")?;
        let mut product = read_doc(&tx, id)?.ok_or_else(|| StoreError::ProductNotFound(id.to_string()))?;
        let out = edit(&mut product)?;
        write_doc(&tx, &product)?;
        tx.commit().context("committing document edit")?;
        histogram!("persist_edit_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn query(&self, q: &StoreQuery) -> StoreResult<Vec<Product>> { self.select(q) }

    async fn get(&self, id: &str) -> StoreResult<Option<Product>> { self.fetch(id) }

    async fn list(&self) -> StoreResult<Vec<Product>> { self.select(&StoreQuery::default()) }

    async fn upsert(&self, product: Product) -> StoreResult<()> { self.put(&product) }

    async fn delete(&self, id: &str) -> StoreResult<bool> { self.remove(id) }

    async fn add_review(&self, product_id: &str, review: Review) -> StoreResult<Review> {
        self.edit(product_id, |p| {
            p.reviews.push(review.clone());
            Ok(review)
        })
    }

    async fn update_review(&self, product_id: &str, review_id: &str, patch: ReviewPatch) -> StoreResult<Review> {
        self.edit(product_id, |p| patch_review(p, review_id, patch))
    }

    async fn delete_review(&self, product_id: &str, review_id: &str) -> StoreResult<()> {
        self.edit(product_id, |p| remove_review(p, review_id))
    }
}

fn read_doc(db: &Connection, id: &str) -> Result<Option<Product>> {
    let doc: Option<String> = db
        .query_row("SELECT doc FROM products WHERE id = ?1", [id], |r| r.get(0))
        .optional()
        .with_context(|| format!("loading product {id}"))?;
    doc.map(|d| decode(id, &d)).transpose()
}

fn write_doc(db: &Connection, p: &Product) -> Result<()> {
    let doc = serde_json::to_string(p).with_context(|| format!("encoding product {}", p.id))?;
    db.execute(
        "INSERT OR REPLACE INTO products(id, title, price, category, rating, stock, doc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![p.id, p.title, p.price, p.category, p.rating, i64::from(p.stock), doc],
    )
    .with_context(|| format!("writing product {}", p.id))?;
    Ok(())
}

fn decode(id: &str, doc: &str) -> Result<Product> {
    serde_json::from_str(doc).with_context(|| format!("decoding stored product {id}"))
}
