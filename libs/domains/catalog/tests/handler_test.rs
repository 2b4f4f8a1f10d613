//! Handler tests for the catalog domain
//!
//! Routers run over the in-memory catalog; the Postgres repository is
//! exercised against a testcontainers database at the end.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::{Extension, Router};
use axum_helpers::{JwtClaims, TokenKind};
use axum_helpers::csv_io::{ImportMode, ImportReport};
use domain_catalog::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_utils::{TestDataBuilder, TestDatabase};
use tower::ServiceExt;
use uuid::Uuid;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn claims() -> JwtClaims {
    JwtClaims {
        sub: Uuid::now_v7().to_string(),
        email: "manager@shop.test".into(),
        name: "Manager".into(),
        roles: vec!["manager".into()],
        exp: i64::MAX,
        iat: 0,
        jti: Uuid::new_v4().to_string(),
        kind: TokenKind::Access,
    }
}

fn app(service: CatalogService<InMemoryCatalog>) -> Router {
    handlers::router(service).layer(Extension(claims()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn product_body(title: &str, sku: &str, price_cents: i64) -> Value {
    json!({ "title": title, "sku": sku, "price_cents": price_cents, "stock": 5 })
}

async fn create_product(app: &Router, title: &str, sku: &str) -> Product {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/products", product_body(title, sku, 1500)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response.into_body()).await
}

#[tokio::test]
async fn test_create_and_fetch_product() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let product = create_product(&app, "Linen Shirt", "SHIRT-1").await;

    assert_eq!(product.slug, "linen-shirt");
    assert_eq!(product.currency, "USD");
    assert_eq!(product.status, ProductStatus::Draft);

    let response = app
        .clone()
        .oneshot(get(&format!("/products/{}", product.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/products/by-slug/linen-shirt"))
        .await
        .unwrap();
    let fetched: Product = json_body(response.into_body()).await;
    assert_eq!(fetched.id, product.id);
}

#[tokio::test]
async fn test_create_rejects_compare_at_below_price() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let response = app
        .oneshot(json_request(
            "POST",
            "/products",
            json!({ "title": "Mug", "sku": "MUG-1", "price_cents": 1000, "compare_at_price_cents": 900 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_sku_conflicts() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    create_product(&app, "Mug", "MUG-1").await;

    let response = app
        .oneshot(json_request("POST", "/products", product_body("Other Mug", "MUG-1", 100)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_stock_cannot_go_negative() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let product = create_product(&app, "Mug", "MUG-1").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/products/{}/stock", product.id),
            json!({ "delta": -6, "reason": "breakage" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["details"]["reason"], "insufficient_stock");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/products/{}/stock", product.id),
            json!({ "delta": -5, "reason": "sold at market" }),
        ))
        .await
        .unwrap();
    let product: Product = json_body(response.into_body()).await;
    assert_eq!(product.stock, 0);
}

#[tokio::test]
async fn test_publish_then_filter_by_status() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let mug = create_product(&app, "Mug", "MUG-1").await;
    create_product(&app, "Teapot", "POT-1").await;

    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/products/{}/publish", mug.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/products?status=active")).await.unwrap();
    let products: Vec<Product> = json_body(response.into_body()).await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, mug.id);
}

#[tokio::test]
async fn test_category_cycle_is_422_and_parent_delete_is_409() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));

    let response = app
        .clone()
        .oneshot(json_request("POST", "/categories", json!({ "name": "Home" })))
        .await
        .unwrap();
    let home: Category = json_body(response.into_body()).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/categories",
            json!({ "name": "Kitchen", "parent_id": home.id }),
        ))
        .await
        .unwrap();
    let kitchen: Category = json_body(response.into_body()).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/categories/{}", home.id),
            json!({ "parent_id": kitchen.id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .clone()
        .oneshot(
            Request::delete(format!("/categories/{}", home.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.oneshot(get("/categories/tree")).await.unwrap();
    let tree: Vec<CategoryNode> = json_body(response.into_body()).await;
    assert_eq!(tree[0].children[0].category.id, kitchen.id);
}

#[tokio::test]
async fn test_collection_membership() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let mug = create_product(&app, "Mug", "MUG-1").await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/collections", json!({ "title": "Gift Ideas" })))
        .await
        .unwrap();
    let collection: Collection = json_body(response.into_body()).await;
    assert_eq!(collection.slug, "gift-ideas");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/collections/{}/products", collection.id),
            json!({ "product_ids": [mug.id, Uuid::now_v7()] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/collections/{}/products", collection.id),
            json!({ "product_ids": [mug.id] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::delete(format!("/collections/{}/products/{}", collection.id, mug.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/collections/{}", collection.id)))
        .await
        .unwrap();
    let collection: Collection = json_body(response.into_body()).await;
    assert_eq!(collection.product_count, 0);
}

#[tokio::test]
async fn test_csv_import_then_export() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let csv = "sku,name,amount,inventory\nCUP-1,Cup,4.50,3\nCUP-2,Saucer,oops,1\n";

    let response = app
        .clone()
        .oneshot(
            Request::post("/products/import?mode=upsert")
                .header("content-type", "text/csv")
                .body(Body::from(csv))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: ImportReport = json_body(response.into_body()).await;
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.errors[0].row, 2);
    assert_eq!(report.errors[0].field.as_deref(), Some("price"));

    let response = app.oneshot(get("/products/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment")
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("CUP-1,Cup,cup,,4.50,,USD,3,draft"));
}

#[tokio::test]
async fn test_import_without_required_columns_is_400() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let response = app
        .oneshot(
            Request::post("/products/import")
                .body(Body::from("sku,title\nA-1,Thing\n"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_endpoint() {
    let service = CatalogService::new(InMemoryCatalog::new());
    let catalog = app(service.clone());
    create_product(&catalog, "Stoneware Mug", "MUG-1").await;
    create_product(&catalog, "Teapot", "POT-1").await;

    let search = handlers::search_router(service);

    let response = search
        .clone()
        .oneshot(get("/?q=mug&kinds=product"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let results: SearchResults = json_body(response.into_body()).await;
    assert_eq!(results.total, 1);
    assert_eq!(results.hits[0].kind, SearchKind::Product);
    assert_eq!(results.hits[0].title, "Stoneware Mug");

    let response = search.oneshot(get("/?q=%20%20")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_uuid_is_400() {
    let app = app(CatalogService::new(InMemoryCatalog::new()));
    let response = app.oneshot(get("/products/not-a-uuid")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_postgres_catalog_round_trip() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("catalog_pg_round_trip");
    let service = CatalogService::new(PgCatalogRepository::new(db.connection()));

    let category = service
        .create_category(CreateCategory {
            name: "Kitchen".into(),
            slug: None,
            description: String::new(),
            parent_id: None,
            position: 0,
        })
        .await
        .unwrap();

    let sku = builder.sku("mug");
    let product = service
        .create_product(CreateProduct {
            title: "Stoneware Mug".into(),
            slug: None,
            sku: sku.clone(),
            description: "Holds 350ml".into(),
            price_cents: 1800,
            compare_at_price_cents: Some(2400),
            currency: Some("eur".into()),
            stock: 2,
            status: ProductStatus::Active,
            category_id: Some(category.id),
            tags: vec!["Kitchen".into(), "gift".into()],
            images: vec![],
        })
        .await
        .unwrap();
    assert_eq!(product.currency, "EUR");

    let err = service
        .adjust_stock(
            product.id,
            domain_catalog::models::AdjustStock {
                delta: -3,
                reason: "test".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InsufficientStock { resulting: -1, .. }));

    let tagged = service
        .list_products(ProductFilter {
            tag: Some("GIFT".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tagged.len(), 1);

    let collection = service
        .create_collection(CreateCollection {
            title: "Gifts".into(),
            slug: None,
            description: String::new(),
            image_url: None,
            is_published: true,
        })
        .await
        .unwrap();
    let change = service
        .add_products(
            collection.id,
            domain_catalog::models::AddProducts {
                product_ids: vec![product.id, product.id],
            },
        )
        .await
        .unwrap();
    assert_eq!(change.added, 1);
    assert_eq!(change.product_count, 1);

    let results = service
        .search(domain_catalog::models::SearchQuery {
            q: "stoneware".into(),
            kinds: None,
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(results.hits[0].id, product.id);

    // Deleting the category detaches the product
    service.delete_category(category.id).await.unwrap();
    let product = service.get_product(product.id).await.unwrap();
    assert_eq!(product.category_id, None);

    let exported = service.export_products(ProductFilter::default()).await.unwrap();
    assert!(exported.contains(&sku));

    let report = service
        .import_products(
            format!("sku,title,price\n{sku},Big Mug,20\n").as_bytes(),
            ImportMode::Upsert,
        )
        .await
        .unwrap();
    assert_eq!(report.updated, 1);
}
