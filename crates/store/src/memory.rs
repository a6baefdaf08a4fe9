//! In-RAM catalog: immutable snapshots swapped atomically, writes serialized
//! through a single builder.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use shopfront_core::{sort_products, Product, Review};
use tracing::debug;

use crate::{patch_review, remove_review, DocumentStore, ReviewPatch, StoreError, StoreQuery, StoreResult};

#[derive(Debug, Clone)]
pub enum CatalogChange {
    Upsert(Product),
    Remove(String),
}

/// Frozen view of the catalog. Products are in document id order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub epoch: u64,
    pub products: Vec<Product>,
    index: FxHashMap<String, usize>,
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.index.get(id).and_then(|i| self.products.get(*i))
    }

    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }
}

/// Builds catalog snapshots from change batches.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    epoch: u64,
    docs: BTreeMap<String, Product>,
}

impl CatalogBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn epoch(&self) -> u64 { self.epoch }

    /// Apply a batch; invalid upserts abort the batch before anything changes.
    pub fn apply(&mut self, batch: Vec<CatalogChange>) -> StoreResult<()> {
        for c in batch.iter() {
            if let CatalogChange::Upsert(p) = c { p.validate()?; }
        }
        for c in batch {
            match c {
                CatalogChange::Upsert(p) => { self.docs.insert(p.id.clone(), p); }
                CatalogChange::Remove(id) => { self.docs.remove(&id); }
            }
        }
        self.bump();
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool { self.docs.contains_key(id) }

    /// Mutable access for in-place document edits; call `bump` afterwards.
    pub fn product_mut(&mut self, id: &str) -> StoreResult<&mut Product> {
        self.docs.get_mut(id).ok_or_else(|| StoreError::ProductNotFound(id.to_string()))
    }

    pub fn bump(&mut self) { self.epoch = self.epoch.saturating_add(1); }

    pub fn freeze(&self) -> Arc<Catalog> {
        let products: Vec<Product> = self.docs.values().cloned().collect();
        let index = products.iter().enumerate().map(|(i, p)| (p.id.clone(), i)).collect();
        Arc::new(Catalog { epoch: self.epoch, products, index })
    }
}

/// `DocumentStore` over RAM snapshots. Readers never take the writer lock.
pub struct MemoryStore {
    snap: ArcSwap<Catalog>,
    writer: Mutex<CatalogBuilder>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { snap: ArcSwap::from_pointee(Catalog::default()), writer: Mutex::new(CatalogBuilder::new()) }
    }
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_products(products: Vec<Product>) -> StoreResult<Self> {
        let store = Self::new();
        store.apply(products.into_iter().map(CatalogChange::Upsert).collect())?;
        Ok(store)
    }

    pub fn current(&self) -> Arc<Catalog> { self.snap.load_full() }

    /// Apply a change batch and publish it; returns the new epoch.
    pub fn apply(&self, batch: Vec<CatalogChange>) -> StoreResult<u64> {
        self.write(|b| {
            b.apply(batch)?;
            Ok(b.epoch())
        })
    }

    /// Epoch of the currently published snapshot.
    pub fn epoch(&self) -> u64 { self.current().epoch }

    fn lock(&self) -> StoreResult<MutexGuard<'_, CatalogBuilder>> {
        self.writer.lock().map_err(|_| StoreError::Unavailable("catalog writer poisoned".into()))
    }

    // Run one edit under the writer lock and publish the next snapshot on success.
    fn write<T>(&self, edit: impl FnOnce(&mut CatalogBuilder) -> StoreResult<T>) -> StoreResult<T> {
        let mut builder = self.lock()?;
        let out = edit(&mut *builder)?;
        let next = builder.freeze();
        debug!(epoch = next.epoch, products = next.len(), "catalog snapshot swapped");
        self.snap.store(next);
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, q: &StoreQuery) -> StoreResult<Vec<Product>> {
        let started = Instant::now();
        let snap = self.current();
        let mut out: Vec<Product> = snap.products.iter().filter(|p| q.matches(p)).cloned().collect();
        sort_products(&mut out, q.sort_by, q.order);
        metrics::histogram!("store_query_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(out)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.current().get(id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        Ok(self.current().products.clone())
    }

    async fn upsert(&self, product: Product) -> StoreResult<()> {
        self.apply(vec![CatalogChange::Upsert(product)]).map(|_| ())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.write(|b| {
            let existed = b.contains(id);
            if existed { b.apply(vec![CatalogChange::Remove(id.to_string())])?; }
            Ok(existed)
        })
    }

    async fn add_review(&self, product_id: &str, review: Review) -> StoreResult<Review> {
        self.write(|b| {
            b.product_mut(product_id)?.reviews.push(review.clone());
            b.bump();
            Ok(review)
        })
    }

    async fn update_review(&self, product_id: &str, review_id: &str, patch: ReviewPatch) -> StoreResult<Review> {
        self.write(|b| {
            let updated = patch_review(b.product_mut(product_id)?, review_id, patch)?;
            b.bump();
            Ok(updated)
        })
    }

    async fn delete_review(&self, product_id: &str, review_id: &str) -> StoreResult<()> {
        self.write(|b| {
            remove_review(b.product_mut(product_id)?, review_id)?;
            b.bump();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, title: &str) -> Product {
        Product { id: id.into(), title: title.into(), price: 1.0, rating: 4.0, ..Default::default() }
    }

    #[test]
    fn replay_changes_produce_id_ordered_snapshots() {
        let mut b = CatalogBuilder::new();
        b.apply(vec![
            CatalogChange::Upsert(product("003", "c")),
            CatalogChange::Upsert(product("001", "a")),
            CatalogChange::Upsert(product("002", "b")),
        ])
        .unwrap();
        let s1 = b.freeze();
        assert_eq!(s1.epoch, 1);
        let ids: Vec<&str> = s1.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["001", "002", "003"]);

        b.apply(vec![CatalogChange::Upsert(product("001", "a2")), CatalogChange::Remove("002".into())]).unwrap();
        let s2 = b.freeze();
        assert_eq!(s2.epoch, 2);
        assert_eq!(s2.len(), 2);
        assert_eq!(s2.get("001").map(|p| p.title.as_str()), Some("a2"));
        assert!(s2.get("002").is_none());
        // earlier snapshot is untouched
        assert_eq!(s1.get("001").map(|p| p.title.as_str()), Some("a"));
    }

    #[test]
    fn invalid_upsert_leaves_builder_unchanged() {
        let mut b = CatalogBuilder::new();
        let mut bad = product("002", "b");
        bad.price = -3.0;
        let res = b.apply(vec![CatalogChange::Upsert(product("001", "a")), CatalogChange::Upsert(bad)]);
        assert!(matches!(res, Err(StoreError::InvalidDocument(_))));
        assert_eq!(b.epoch(), 0);
        assert!(b.freeze().is_empty());
    }
}
