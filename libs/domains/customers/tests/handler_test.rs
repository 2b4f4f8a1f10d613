//! Handler tests for customers and the contact inbox

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use axum_helpers::csv_io::ImportReport;
use axum_helpers::{JwtClaims, TokenKind};
use domain_customers::*;
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
        email: "support@shop.test".into(),
        name: "Support".into(),
        roles: vec!["support".into()],
        exp: i64::MAX,
        iat: 0,
        jti: Uuid::new_v4().to_string(),
        kind: TokenKind::Access,
    }
}

fn customers_app() -> Router {
    handlers::router(CustomerService::new(InMemoryCustomers::new())).layer(Extension(claims()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_create_customer_and_duplicate_email() {
    let app = customers_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "email": "Ana@Shop.test", "first_name": "Ana", "tags": ["VIP"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let customer: Customer = json_body(response.into_body()).await;
    assert_eq!(customer.email, "ana@shop.test");
    assert_eq!(customer.tags, vec!["vip"]);

    let response = app
        .oneshot(json_request("POST", "/", json!({ "email": "ana@shop.test" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_email_is_400() {
    let response = customers_app()
        .oneshot(json_request("POST", "/", json!({ "email": "nope" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_then_search() {
    let app = customers_app();

    let response = app
        .clone()
        .oneshot(
            Request::post("/import?mode=upsert")
                .header("content-type", "text/csv")
                .body(Body::from(
                    "email,first_name,last_name,accepts_marketing\n\
                     ana@shop.test,Ana,Lima,true\n\
                     bo@shop.test,Bo,Reyes,false\n",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: ImportReport = json_body(response.into_body()).await;
    assert_eq!(report.created, 2);

    let response = app
        .oneshot(
            Request::get("/?search=rey&accepts_marketing=false")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let found: Vec<Customer> = json_body(response.into_body()).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "bo@shop.test");
}

#[tokio::test]
async fn test_public_submit_and_inbox() {
    let service = ContactService::new(InMemoryContactMessages::new());
    let form = handlers::public_contact_router(service.clone());
    let inbox = handlers::contact_router(service).layer(Extension(claims()));

    let response = form
        .clone()
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "name": "Cy", "email": "cy@shop.test", "body": "Is the mug dishwasher safe?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let message: ContactMessage = json_body(response.into_body()).await;
    assert_eq!(message.status, ContactStatus::New);

    let response = form
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "name": "Cy", "email": "cy@shop.test", "body": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = inbox
        .clone()
        .oneshot(Request::get("/unread-count").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let count: UnreadCount = json_body(response.into_body()).await;
    assert_eq!(count.unread, 1);

    let response = inbox
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/{}/status", message.id),
            json!({ "status": "replied" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = inbox
        .oneshot(Request::get("/?status=replied").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let replied: Vec<ContactMessage> = json_body(response.into_body()).await;
    assert_eq!(replied.len(), 1);
}

#[tokio::test]
async fn test_postgres_customers_round_trip() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("customers_pg_round_trip");
    let customers = CustomerService::new(PgCustomerRepository::new(db.connection()));
    let contact = ContactService::new(PgContactRepository::new(db.connection()));

    let email = builder.email("shopper");
    let created = customers
        .create_customer(CreateCustomer {
            email: email.clone(),
            first_name: "Dee".into(),
            last_name: "Park".into(),
            phone: None,
            accepts_marketing: true,
            tags: vec!["Newsletter".into()],
            note: None,
        })
        .await
        .unwrap();

    let listed = customers
        .list_customers(CustomerFilter {
            tag: Some("newsletter".into()),
            search: Some("park".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(listed.iter().any(|c| c.id == created.id));

    let err = customers
        .create_customer(CreateCustomer {
            email: email.to_uppercase(),
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            accepts_marketing: false,
            tags: vec![],
            note: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::DuplicateEmail(_)));

    let message = contact
        .submit(SubmitContact {
            name: "Dee".into(),
            email,
            subject: None,
            body: "Hello".into(),
        })
        .await
        .unwrap();
    let before = contact.unread_count().await.unwrap().unread;
    contact
        .set_status(message.id, ContactStatus::Archived)
        .await
        .unwrap();
    assert_eq!(contact.unread_count().await.unwrap().unread, before - 1);
}
