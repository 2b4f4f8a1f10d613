//! Messaging Domain
//!
//! Support threads between customers and staff, stored messages with
//! per-recipient delivery state, and a WebSocket gateway that pushes new
//! messages, receipts, typing and thread changes to connected clients.
//!
//! Sockets join rooms: `thread:{id}` after a `join`, `user:{id}` for every
//! socket of a user and `agents` for every staff socket.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{JwtCodec, JwtConfig, SharedAuthority};
//! use domain_messaging::{handlers, InMemoryMessaging, MessagingService, MessagingSettings};
//! use std::sync::Arc;
//!
//! let config = JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap();
//! let authority: SharedAuthority = Arc::new(JwtCodec::new(&config));
//! let service = MessagingService::new(InMemoryMessaging::new(), authority, MessagingSettings::default());
//!
//! let api = handlers::router(service.clone());
//! let gateway = handlers::gateway_router(service.clone());
//! let storefront = handlers::support_router(service);
//! ```

pub mod entity;
pub mod error;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod hub;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{MessagingError, MessagingResult};
pub use events::{ClientCommand, ServerEvent};
pub use hub::{Client, ClientId, Hub, HubStats, Room};
pub use models::{
    Attachment, ConversationStarted, CreateThread, Delivery, DeliveryStatus, Identity, MarkRead,
    Message, MessagePage, Participant, ParticipantRole, ReadReceipt, SendMessage,
    StartConversation, Thread, ThreadFilter, ThreadStatus, UnreadThread, UpdateThread,
    customer_id_for_email,
};
pub use postgres::PgMessagingRepository;
pub use repository::{InMemoryMessaging, MessagingRepository};
pub use service::{MessagingService, MessagingSettings};
