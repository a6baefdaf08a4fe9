use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use shopfront_api::Storefront;
use shopfront_auth::{Claims, HmacVerifier};
use shopfront_core::Product;
use shopfront_server::build_router;
use shopfront_store::MemoryStore;
use tower::ServiceExt;

const SECRET: &str = "http-test-secret";

fn app() -> Router {
    let products = (1..=25)
        .map(|i| Product {
            id: format!("{i:03}"),
            title: if i == 1 { "Essence Mascara Lash Princess".into() } else { format!("Item {i}") },
            price: i as f64,
            category: if i % 2 == 0 { "beauty".into() } else { "groceries".into() },
            ..Default::default()
        })
        .collect();
    let store = MemoryStore::from_products(products).unwrap();
    let shop = Storefront::new(Arc::new(store), Arc::new(HmacVerifier::new(SECRET)));
    build_router(Arc::new(shop))
}

fn bearer(email: &str) -> String {
    let tok = HmacVerifier::new(SECRET)
        .mint(&Claims::new(email, Some("Tester".into()), chrono::Duration::hours(1)))
        .unwrap();
    format!("Bearer {tok}")
}

async fn call(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(a) = auth { req = req.header(header::AUTHORIZATION, a); }
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn listing_reports_page_metadata() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/products?page=2&limit=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pageSize"], 10);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["totalProducts"], 25);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["products"][0]["id"], "011");

    let (_, body) = call(&app, Method::GET, "/api/products?sortBy=price&sortOrder=desc&category=beauty&limit=3", None, None).await;
    assert_eq!(body["totalProducts"], 12);
    assert_eq!(body["products"][0]["id"], "024");

    let (_, body) = call(&app, Method::GET, "/api/products?search=essence", None, None).await;
    assert_eq!(body["totalProducts"], 1);
    assert_eq!(body["products"][0]["title"], "Essence Mascara Lash Princess");
}

#[tokio::test]
async fn bad_listing_params_are_400() {
    let app = app();
    for uri in [
        "/api/products?page=abc",
        "/api/products?limit=0",
        "/api/products?sortBy=colour",
        "/api/products?order=sideways",
        "/api/products?page=1&page=2",
    ] {
        let (status, body) = call(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn detail_and_categories() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/products/5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "005");

    let (status, body) = call(&app, Method::GET, "/api/products/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Product not found" }));

    let (status, body) = call(&app, Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["groceries", "beauty"]));
}

#[tokio::test]
async fn review_lifecycle_over_http() {
    let app = app();
    let ann = bearer("ann@x.io");
    let bob = bearer("bob@x.io");
    let uri = "/api/products/3/reviews";

    let (status, body) = call(&app, Method::POST, uri, None, Some(json!({ "rating": 5, "comment": "x" }))).await;
    assert_eq!((status, body), (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })));

    let (status, _) = call(&app, Method::POST, uri, Some(&ann), Some(json!({ "rating": 9, "comment": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, review) = call(&app, Method::POST, uri, Some(&ann), Some(json!({ "rating": 4, "comment": "solid" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["reviewerEmail"], "ann@x.io");
    let review_id = review["id"].as_str().unwrap().to_string();

    let (_, product) = call(&app, Method::GET, "/api/products/003", None, None).await;
    assert_eq!(product["reviews"][0]["id"], review_id.as_str());

    let edit = json!({ "reviewId": review_id, "rating": 2, "comment": "hijacked" });
    let (status, _) = call(&app, Method::PUT, uri, Some(&bob), Some(edit)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // ownership is decided before the rating is looked at
    let edit = json!({ "reviewId": review_id, "rating": 9, "comment": "hijacked" });
    let (status, body) = call(&app, Method::PUT, uri, Some(&bob), Some(edit)).await;
    assert_eq!((status, body), (StatusCode::FORBIDDEN, json!({ "error": "Not authorized to edit this review" })));

    let edit = json!({ "reviewId": review_id, "rating": "3", "comment": "revised" });
    let (status, body) = call(&app, Method::PUT, uri, Some(&ann), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((body["rating"].as_u64(), body["comment"].as_str()), (Some(3), Some("revised")));

    let (status, _) = call(&app, Method::DELETE, &format!("{uri}?id=nope"), Some(&ann), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::DELETE, uri, Some(&ann), Some(json!({ "reviewId": review_id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Review deleted successfully");

    let (_, product) = call(&app, Method::GET, "/api/products/003", None, None).await;
    assert_eq!(product["reviews"], json!([]));
}

#[tokio::test]
async fn query_rejections_use_the_json_error_body() {
    let app = app();
    let req = Request::builder().uri("/api/products?page=1&page=2").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let ct = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(ct.starts_with("application/json"), "{ct}");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("page"));

    let (status, body) = call(&app, Method::DELETE, "/api/products/1/reviews?id=a&id=b", Some(&bearer("ann@x.io")), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_bodies_are_400() {
    let app = app();
    let ann = bearer("ann@x.io");
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/products/1/reviews")
        .header(header::AUTHORIZATION, &ann)
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::PUT, "/api/products/1/reviews", Some(&ann), Some(json!({ "rating": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
