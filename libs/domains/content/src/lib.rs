//! Content Domain
//!
//! Blog posts with a draft/published/archived lifecycle, ordered FAQs and a
//! media library that stores metadata for files uploaded elsewhere.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{ContentError, ContentResult};
pub use models::{
    BlogPost, CreateFaq, CreatePost, Faq, FaqFilter, MediaAsset, MediaFilter, MediaKind,
    PostFilter, PostStatus, RegisterMedia, ReorderFaqs, UpdateFaq, UpdateMedia, UpdatePost,
};
pub use postgres::PgContentRepository;
pub use repository::{ContentRepository, InMemoryContent};
pub use service::ContentService;
