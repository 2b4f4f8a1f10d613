//! Handler tests for posts, FAQs and media

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use axum_helpers::{JwtClaims, TokenKind};
use domain_content::*;
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
        email: "editor@shop.test".into(),
        name: "Editor".into(),
        roles: vec!["editor".into()],
        exp: i64::MAX,
        iat: 0,
        jti: Uuid::new_v4().to_string(),
        kind: TokenKind::Access,
    }
}

fn app() -> Router {
    handlers::router(ContentService::new(InMemoryContent::new())).layer(Extension(claims()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = app();

    let response = send(
        &app,
        json_request("POST", "/posts", json!({ "title": "Care guide: linen", "tags": ["Care"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let post: BlogPost = json_body(response.into_body()).await;
    assert_eq!(post.slug, "care-guide-linen");
    assert_eq!(post.status, PostStatus::Draft);

    let response = send(&app, empty_request("POST", &format!("/posts/{}/publish", post.id))).await;
    let published: BlogPost = json_body(response.into_body()).await;
    assert_eq!(published.status, PostStatus::Published);
    assert!(published.published_at.is_some());

    let response = send(&app, empty_request("GET", "/posts/by-slug/care-guide-linen")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, empty_request("GET", "/posts?status=draft")).await;
    let drafts: Vec<BlogPost> = json_body(response.into_body()).await;
    assert!(drafts.is_empty());

    let response = send(&app, empty_request("POST", &format!("/posts/{}/unpublish", post.id))).await;
    let draft: BlogPost = json_body(response.into_body()).await;
    assert_eq!(draft.published_at, published.published_at);

    let response = send(&app, empty_request("DELETE", &format!("/posts/{}", post.id))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&app, empty_request("GET", &format!("/posts/{}", post.id))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_validation() {
    let app = app();
    let response = send(&app, json_request("POST", "/posts", json!({ "title": "   " }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            "POST",
            "/posts",
            json!({ "title": "Hello", "cover_image_url": "not a url" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_faq_reorder() {
    let app = app();
    let mut ids = Vec::new();
    for question in ["Shipping?", "Returns?", "Sizing?"] {
        let response = send(
            &app,
            json_request("POST", "/faqs", json!({ "question": question, "answer": "See policy." })),
        )
        .await;
        let faq: Faq = json_body(response.into_body()).await;
        ids.push(faq.id);
    }

    let response = send(
        &app,
        json_request("POST", "/faqs/reorder", json!({ "ids": [ids[2], ids[0], ids[1]] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let faqs: Vec<Faq> = json_body(response.into_body()).await;
    assert_eq!(faqs[0].question, "Sizing?");
    assert_eq!(faqs[0].position, 0);
    assert_eq!(faqs[2].question, "Returns?");

    let response = send(
        &app,
        json_request("POST", "/faqs/reorder", json!({ "ids": [ids[0], Uuid::now_v7()] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, json_request("POST", "/faqs/reorder", json!({ "ids": [] }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_media_register_and_filter() {
    let app = app();
    for (file, mime) in [
        ("hero.jpg", "image/jpeg"),
        ("lookbook.mp4", "video/mp4"),
        ("returns.pdf", "application/pdf"),
    ] {
        let response = send(
            &app,
            json_request(
                "POST",
                "/media",
                json!({
                    "file_name": file,
                    "url": format!("https://cdn.shop.test/{file}"),
                    "mime_type": mime,
                    "size_bytes": 4096,
                    "folder": "campaigns/spring"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&app, empty_request("GET", "/media?kind=image")).await;
    let images: Vec<MediaAsset> = json_body(response.into_body()).await;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].folder, "/campaigns/spring");

    let response = send(
        &app,
        empty_request("GET", "/media?folder=%2Fcampaigns%2Fspring&search=LOOK"),
    )
    .await;
    let found: Vec<MediaAsset> = json_body(response.into_body()).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, MediaKind::Video);

    let response = send(
        &app,
        json_request(
            "POST",
            "/media",
            json!({ "file_name": "x", "url": "https://cdn.shop.test/x", "mime_type": "nope", "size_bytes": 1 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_postgres_content_round_trip() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("content_pg_round_trip");
    let service = ContentService::new(PgContentRepository::new(db.connection()));

    let title = builder.sku("Post");
    let first = service
        .create_post(CreatePost {
            title: title.clone(),
            slug: None,
            excerpt: Some("Excerpt".into()),
            body: "Body".into(),
            cover_image_url: None,
            author_name: None,
            tags: vec!["News".into()],
            status: PostStatus::Published,
        })
        .await
        .unwrap();
    assert!(first.published_at.is_some());

    let second = service
        .create_post(CreatePost {
            title,
            slug: None,
            excerpt: None,
            body: String::new(),
            cover_image_url: None,
            author_name: None,
            tags: vec![],
            status: PostStatus::Draft,
        })
        .await
        .unwrap();
    assert_eq!(second.slug, format!("{}-2", first.slug));

    let tagged = service
        .list_posts(PostFilter {
            tag: Some("news".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(tagged.iter().any(|p| p.id == first.id));

    let a = service
        .create_faq(CreateFaq {
            question: "First?".into(),
            answer: "Yes".into(),
            category: Some("General".into()),
            position: None,
            is_published: true,
        })
        .await
        .unwrap();
    let b = service
        .create_faq(CreateFaq {
            question: "Second?".into(),
            answer: "No".into(),
            category: Some("General".into()),
            position: None,
            is_published: true,
        })
        .await
        .unwrap();
    assert!(b.position > a.position);

    let err = service
        .reorder_faqs(ReorderFaqs {
            ids: vec![b.id, Uuid::now_v7()],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::UnknownFaqs(_)));
    assert_eq!(service.get_faq(b.id).await.unwrap().position, b.position);

    service
        .reorder_faqs(ReorderFaqs {
            ids: vec![b.id, a.id],
        })
        .await
        .unwrap();
    assert_eq!(service.get_faq(b.id).await.unwrap().position, 0);
    assert_eq!(service.get_faq(a.id).await.unwrap().position, 1);

    let asset = service
        .register_media(RegisterMedia {
            file_name: "guide.pdf".into(),
            url: "https://cdn.shop.test/guide.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 10,
            width: None,
            height: None,
            alt_text: None,
            folder: None,
        })
        .await
        .unwrap();
    let docs = service
        .list_media(MediaFilter {
            kind: Some(MediaKind::Document),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(docs.iter().any(|m| m.id == asset.id));
}
