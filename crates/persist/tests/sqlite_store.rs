use shopfront_core::{Product, Review, SortField, SortOrder};
use shopfront_persist::SqliteStore;
use shopfront_store::{DocumentStore, ReviewPatch, StoreError, StoreQuery};

fn product(id: &str, title: &str, category: &str, price: f64) -> Product {
    Product { id: id.into(), title: title.into(), category: category.into(), price, rating: 4.0, ..Default::default() }
}

fn seeded(path: &std::path::Path) -> SqliteStore {
    let s = SqliteStore::open(path).unwrap();
    s.import(vec![
        product("003", "Powder Canister", "beauty", 14.99),
        product("001", "Essence Mascara Lash Princess", "beauty", 9.99),
        product("002", "Apple", "groceries", 1.99),
        product("004", "Red Lipstick", "beauty", 9.99),
    ])
    .unwrap();
    s
}

fn review(id: &str, email: &str) -> Review {
    Review {
        id: id.into(),
        rating: 4,
        comment: "nice".into(),
        reviewer_email: email.into(),
        reviewer_name: "Ann".into(),
        date: "2024-05-23T08:56:21.618Z".into(),
    }
}

fn ids(ps: &[Product]) -> Vec<&str> {
    ps.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn query_pushes_down_filter_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let s = seeded(&dir.path().join("shop.db"));

    let all = s.list().await.unwrap();
    assert_eq!(ids(&all), vec!["001", "002", "003", "004"]);

    let q = StoreQuery { category: Some("beauty".into()), sort_by: SortField::Price, order: SortOrder::Desc };
    // equal prices keep id order in both directions
    assert_eq!(ids(&s.query(&q).await.unwrap()), vec!["003", "001", "004"]);
    let q = StoreQuery { order: SortOrder::Asc, ..q };
    assert_eq!(ids(&s.query(&q).await.unwrap()), vec!["001", "004", "003"]);

    let q = StoreQuery { category: Some("toys".into()), ..Default::default() };
    assert!(s.query(&q).await.unwrap().is_empty());
    assert_eq!(s.categories().await.unwrap(), vec!["beauty".to_string(), "groceries".to_string()]);
}

#[tokio::test]
async fn reviews_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    {
        let s = seeded(&path);
        s.add_review("001", review("r1", "ann@x.io")).await.unwrap();
        s.add_review("001", review("r2", "bob@x.io")).await.unwrap();
        let patch = ReviewPatch { rating: 2, comment: "meh".into(), date: "2024-06-01T00:00:00.000Z".into() };
        s.update_review("001", "r1", patch).await.unwrap();
        s.delete_review("001", "r2").await.unwrap();
    }
    let s = SqliteStore::open(&path).unwrap();
    let p = s.get("001").await.unwrap().unwrap();
    assert_eq!(p.reviews.len(), 1);
    assert_eq!(p.reviews[0].rating, 2);
    assert_eq!(p.reviews[0].comment, "meh");
    assert_eq!(p.reviews[0].reviewer_email, "ann@x.io");
}

#[tokio::test]
async fn missing_documents_and_reviews_are_reported() {
    let s = SqliteStore::open_in_memory().unwrap();
    assert!(s.get("404").await.unwrap().is_none());
    assert!(matches!(s.add_review("404", review("r1", "a@x.io")).await, Err(StoreError::ProductNotFound(_))));

    s.upsert(product("001", "A", "x", 1.0)).await.unwrap();
    assert!(matches!(s.delete_review("001", "nope").await, Err(StoreError::ReviewNotFound(_))));
    assert!(s.delete("001").await.unwrap());
    assert!(!s.delete("001").await.unwrap());
}
