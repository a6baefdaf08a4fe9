use std::sync::Arc;

use async_trait::async_trait;
use shopfront_api::{ShopError, Storefront, INTERNAL_ERROR};
use shopfront_auth::StaticVerifier;
use shopfront_core::{ListingParams, ListingQuery, Product, Review, SortField, SortOrder};
use shopfront_store::{DocumentStore, MemoryStore, ReviewPatch, StoreError, StoreQuery, StoreResult};

const CATEGORIES: [&str; 3] = ["beauty", "fragrances", "groceries"];

// 25 products, distinct prices, categories cycling.
fn catalog() -> Vec<Product> {
    (1..=25)
        .map(|i| Product {
            id: format!("{i:03}"),
            title: format!("Item {i}"),
            price: 100.0 - i as f64,
            category: CATEGORIES[(i - 1) % 3].to_string(),
            rating: 4.0,
            stock: i as u32,
            ..Default::default()
        })
        .collect()
}

fn shop_with(products: Vec<Product>) -> Storefront {
    let store = MemoryStore::from_products(products).unwrap();
    Storefront::new(Arc::new(store), Arc::new(StaticVerifier::empty()))
}

fn ids(ps: &[Product]) -> Vec<String> {
    ps.iter().map(|p| p.id.clone()).collect()
}

#[tokio::test]
async fn pagination_matches_worked_example() {
    let shop = shop_with(catalog());
    let all = ids(&catalog());

    let q = ListingQuery { page: 2, page_size: 10, ..Default::default() };
    let page = shop.list_products(&q).await.unwrap();
    assert_eq!((page.total_products, page.total_pages, page.has_more), (25, 3, true));
    assert_eq!(ids(&page.products), all[10..20].to_vec());

    let q = ListingQuery { page: 3, ..q };
    let page = shop.list_products(&q).await.unwrap();
    assert_eq!(ids(&page.products), all[20..25].to_vec());
    assert!(!page.has_more);

    let q = ListingQuery { page: 7, ..q };
    let page = shop.list_products(&q).await.unwrap();
    assert!(page.products.is_empty());
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn category_filter_is_exact() {
    let shop = shop_with(catalog());
    let q = ListingQuery { category: Some("beauty".into()), page_size: 100, ..Default::default() };
    let page = shop.list_products(&q).await.unwrap();
    assert_eq!(page.total_products, 9);
    assert!(page.products.iter().all(|p| p.category == "beauty"));

    let q = ListingQuery { category: Some("Beauty".into()), ..Default::default() };
    let page = shop.list_products(&q).await.unwrap();
    assert_eq!((page.total_products, page.total_pages, page.products.len()), (0, 0, 0));
}

#[tokio::test]
async fn price_asc_and_desc_are_reverses() {
    let shop = shop_with(catalog());
    let asc = ListingQuery { sort_by: SortField::Price, order: SortOrder::Asc, page_size: 25, ..Default::default() };
    let desc = ListingQuery { order: SortOrder::Desc, ..asc.clone() };
    let mut a = ids(&shop.list_products(&asc).await.unwrap().products);
    let d = ids(&shop.list_products(&desc).await.unwrap().products);
    a.reverse();
    assert_eq!(a, d);
}

#[tokio::test]
async fn search_runs_before_pagination() {
    let mut products = catalog();
    products[20].title = "Essence Mascara Lash Princess".into();
    products[3].title = "Red Lipstick".into();
    let shop = shop_with(products);

    let q = ListingQuery { search: Some("essence mascara".into()), page_size: 5, ..Default::default() };
    let (page, explain) = shop.list_products_explain(&q).await.unwrap();
    assert_eq!(ids(&page.products), vec!["021".to_string()]);
    assert_eq!(page.total_products, 1);
    assert_eq!(explain.filtered, 25);
    assert_eq!(explain.search.map(|s| s.matched), Some(1));

    let q = ListingQuery { search: Some("zzqqxx".into()), ..Default::default() };
    let page = shop.list_products(&q).await.unwrap();
    assert!(page.products.is_empty());
    assert_eq!(page.total_pages, 0);
}

#[tokio::test]
async fn categories_and_detail_lookup() {
    let shop = shop_with(catalog());
    assert_eq!(shop.categories().await.unwrap(), CATEGORIES.map(String::from).to_vec());
    assert_eq!(shop.product("7").await.unwrap().id, "007");
    assert_eq!(shop.product("099").await, Err(ShopError::NotFound("Product not found".into())));
}

#[tokio::test]
async fn malformed_params_are_validation_errors() {
    let shop = shop_with(catalog());
    let params = ListingParams { sort_by: Some("colour".into()), ..Default::default() };
    assert!(matches!(shop.parse_listing(&params), Err(ShopError::Validation(_))));
    let params = ListingParams { page: Some("-1".into()), ..Default::default() };
    assert!(matches!(shop.parse_listing(&params), Err(ShopError::Validation(_))));
}

struct DownStore;

#[async_trait]
impl DocumentStore for DownStore {
    async fn query(&self, _q: &StoreQuery) -> StoreResult<Vec<Product>> { Err(StoreError::Unavailable("connection refused".into())) }
    async fn get(&self, _id: &str) -> StoreResult<Option<Product>> { Err(StoreError::Unavailable("connection refused".into())) }
    async fn list(&self) -> StoreResult<Vec<Product>> { Err(StoreError::Unavailable("connection refused".into())) }
    async fn upsert(&self, _p: Product) -> StoreResult<()> { Err(StoreError::Unavailable("connection refused".into())) }
    async fn delete(&self, _id: &str) -> StoreResult<bool> { Err(StoreError::Unavailable("connection refused".into())) }
    async fn add_review(&self, _p: &str, _r: Review) -> StoreResult<Review> { Err(StoreError::Unavailable("connection refused".into())) }
    async fn update_review(&self, _p: &str, _r: &str, _patch: ReviewPatch) -> StoreResult<Review> { Err(StoreError::Unavailable("connection refused".into())) }
    async fn delete_review(&self, _p: &str, _r: &str) -> StoreResult<()> { Err(StoreError::Unavailable("connection refused".into())) }
}

#[tokio::test]
async fn store_outage_fails_whole_request() {
    let shop = Storefront::new(Arc::new(DownStore), Arc::new(StaticVerifier::empty()));
    let err = shop.list_products(&ListingQuery::default()).await.unwrap_err();
    assert!(matches!(err, ShopError::Upstream(_)));
    assert_eq!(err.public_message(), INTERNAL_ERROR);
    assert!(matches!(shop.categories().await, Err(ShopError::Upstream(_))));
}
