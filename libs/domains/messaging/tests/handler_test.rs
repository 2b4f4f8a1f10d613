//! Handler tests for support threads, the storefront entry point and the
//! gateway handshake

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use axum_helpers::{JwtClaims, JwtCodec, JwtConfig, SharedAuthority, TokenKind};
use domain_messaging::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::{TestDataBuilder, TestDatabase};
use tower::ServiceExt;
use uuid::Uuid;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn authority() -> SharedAuthority {
    Arc::new(JwtCodec::new(
        &JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap(),
    ))
}

fn service() -> MessagingService<InMemoryMessaging> {
    MessagingService::new(InMemoryMessaging::new(), authority(), MessagingSettings::default())
}

fn agent_claims() -> JwtClaims {
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

fn customer_claims(email: &str) -> JwtClaims {
    JwtClaims {
        sub: customer_id_for_email(email).to_string(),
        email: email.into(),
        name: "Jane".into(),
        roles: vec!["customer".into()],
        ..agent_claims()
    }
}

fn app(service: &MessagingService<InMemoryMessaging>, claims: JwtClaims) -> Router {
    handlers::router(service.clone()).layer(Extension(claims))
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
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn open_thread(agent: &Router) -> Thread {
    let response = agent
        .clone()
        .oneshot(json_request(
            "POST",
            "/threads",
            json!({ "customer_email": "Jane@Example.com", "subject": "Damaged parcel" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response.into_body()).await
}

#[tokio::test]
async fn test_customers_only_see_their_threads() {
    let service = service();
    let agent = app(&service, agent_claims());
    let thread = open_thread(&agent).await;

    let jane = app(&service, customer_claims("jane@example.com"));
    let response = jane.clone().oneshot(get("/threads")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let threads: Vec<Thread> = json_body(response.into_body()).await;
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].id, thread.id);

    let stranger = app(&service, customer_claims("bob@example.com"));
    let threads: Vec<Thread> =
        json_body(stranger.clone().oneshot(get("/threads")).await.unwrap().into_body()).await;
    assert!(threads.is_empty());

    let response = stranger
        .oneshot(get(&format!("/threads/{}", thread.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = jane
        .oneshot(json_request("POST", "/threads", json!({ "customer_email": "jane@example.com", "subject": "Me again" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_closed_thread_rejects_customer_and_reopens_for_agent() {
    let service = service();
    let agent = app(&service, agent_claims());
    let jane = app(&service, customer_claims("jane@example.com"));
    let thread = open_thread(&agent).await;

    let response = jane
        .clone()
        .oneshot(json_request("PATCH", &format!("/threads/{}", thread.id), json!({ "status": "closed" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = agent
        .clone()
        .oneshot(json_request("PATCH", &format!("/threads/{}", thread.id), json!({ "status": "closed" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/threads/{}/messages", thread.id);
    let response = jane
        .oneshot(json_request("POST", &uri, json!({ "body": "Still broken" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = agent
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "body": "Let me look again" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let reopened: Thread = json_body(
        agent
            .oneshot(get(&format!("/threads/{}", thread.id)))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(reopened.status, ThreadStatus::Open);
    assert!(reopened.last_message_at.is_some());
}

#[tokio::test]
async fn test_unread_and_read_receipt() {
    let service = service();
    let agent = app(&service, agent_claims());
    let jane = app(&service, customer_claims("jane@example.com"));
    let thread = open_thread(&agent).await;

    let uri = format!("/threads/{}/messages", thread.id);
    for body in ["We are on it", "A replacement ships today"] {
        let response = agent
            .clone()
            .oneshot(json_request("POST", &uri, json!({ "body": body })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let unread: Vec<UnreadThread> =
        json_body(jane.clone().oneshot(get("/unread")).await.unwrap().into_body()).await;
    assert_eq!(unread, vec![UnreadThread { thread_id: thread.id, unread: 2 }]);

    let messages: Vec<Message> = json_body(
        jane.clone()
            .oneshot(get(&format!("{uri}?limit=1")))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "A replacement ships today");

    let response = jane
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/threads/{}/read", thread.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let receipt: ReadReceipt = json_body(response.into_body()).await;
    assert_eq!(receipt.marked, 2);
    assert_eq!(receipt.up_to, Some(messages[0].id));

    let unread: Vec<UnreadThread> =
        json_body(jane.oneshot(get("/unread")).await.unwrap().into_body()).await;
    assert!(unread.is_empty());
}

#[tokio::test]
async fn test_message_validation() {
    let service = service();
    let agent = app(&service, agent_claims());
    let thread = open_thread(&agent).await;
    let uri = format!("/threads/{}/messages", thread.id);

    let response = agent
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "body": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = agent
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "body": "See photo", "attachments": [{ "url": "not a url" }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_are_staff_only() {
    let service = service();
    let response = app(&service, customer_claims("jane@example.com"))
        .oneshot(get("/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app(&service, agent_claims()).oneshot(get("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats: HubStats = json_body(response.into_body()).await;
    assert_eq!(stats.connections, 0);
}

#[tokio::test]
async fn test_non_uuid_subject_is_401() {
    let service = service();
    let claims = JwtClaims {
        sub: "legacy-user".into(),
        ..agent_claims()
    };
    let response = app(&service, claims).oneshot(get("/threads")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_storefront_conversation() {
    let service = service();
    let storefront = handlers::support_router(service.clone());

    let response = storefront
        .clone()
        .oneshot(json_request(
            "POST",
            "/conversations",
            json!({ "email": "not-an-email", "subject": "Hi", "body": "Hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = storefront
        .oneshot(json_request(
            "POST",
            "/conversations",
            json!({ "email": "jane@example.com", "name": "Jane", "subject": "Sizing", "body": "Does it run small?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let started: ConversationStarted = json_body(response.into_body()).await;
    assert!(!started.token.is_empty());

    let identity = service.authenticate(&started.token).await.unwrap();
    assert_eq!(identity.role, ParticipantRole::Customer);

    let threads: Vec<Thread> = json_body(
        app(&service, agent_claims())
            .oneshot(get("/threads?status=open"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].assigned_to, None);
}

#[tokio::test]
async fn test_gateway_handshake_checks() {
    let service = service();
    let gateway = handlers::gateway_router(service.clone());

    let response = gateway.clone().oneshot(get("/ws")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = gateway.clone().oneshot(get("/ws?token=garbage")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // valid token but a plain GET, not an upgrade
    let started = service
        .start_conversation(StartConversation {
            email: "jane@example.com".into(),
            name: None,
            subject: "Sizing".into(),
            body: "Hello".into(),
        })
        .await
        .unwrap();
    let response = gateway
        .oneshot(get(&format!("/ws?token={}", started.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let full = MessagingService::new(
        InMemoryMessaging::new(),
        authority(),
        MessagingSettings {
            max_connections: 0,
            ..MessagingSettings::default()
        },
    );
    let response = handlers::gateway_router(full)
        .oneshot(
            Request::builder()
                .uri("/ws")
                .header("authorization", format!("Bearer {}", started.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_postgres_messaging_round_trip() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("messaging_pg_round_trip");
    let service = MessagingService::new(
        PgMessagingRepository::new(db.connection()),
        authority(),
        MessagingSettings::default(),
    );

    let agent = Identity {
        user_id: builder.user_id(),
        role: ParticipantRole::Agent,
        name: "Agent".into(),
    };
    let email = builder.email("shopper");
    let thread = service
        .open_thread(
            &agent,
            CreateThread {
                customer_email: email.clone(),
                customer_name: None,
                subject: "Returns".into(),
            },
        )
        .await
        .unwrap();

    let customer = Identity {
        user_id: customer_id_for_email(&email),
        role: ParticipantRole::Customer,
        name: "Shopper".into(),
    };
    let message = service
        .send_message(
            &customer,
            thread.id,
            SendMessage {
                body: "How do I send this back?".into(),
                attachments: vec![],
                client_ref: None,
            },
            None,
        )
        .await
        .unwrap();

    let touched = service.get_thread(&agent, thread.id).await.unwrap();
    assert_eq!(touched.last_message_at, Some(touched.updated_at));
    assert!(touched.updated_at > thread.updated_at);

    let unread = service.unread(&agent).await.unwrap();
    assert_eq!(unread, vec![UnreadThread { thread_id: thread.id, unread: 1 }]);

    let changes = service.mark_delivered(&agent, vec![message.id]).await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].sender_id, customer.user_id);

    let receipt = service.mark_read(&agent, thread.id, None).await.unwrap();
    assert_eq!(receipt.marked, 1);
    // already read; delivered cannot move it back
    assert!(service.mark_delivered(&agent, vec![message.id]).await.unwrap().is_empty());

    service
        .update_thread(
            &agent,
            thread.id,
            UpdateThread {
                status: Some(ThreadStatus::Closed),
                assigned_to: Some(None),
            },
        )
        .await
        .unwrap();
    let err = service
        .send_message(
            &customer,
            thread.id,
            SendMessage {
                body: "Hello?".into(),
                attachments: vec![],
                client_ref: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MessagingError::ThreadClosed(_)));

    let threads = service
        .list_threads(&customer, ThreadFilter::default())
        .await
        .unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].status, ThreadStatus::Closed);
    assert_eq!(threads[0].assigned_to, None);
}
