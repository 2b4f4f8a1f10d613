//! Catalog Domain
//!
//! Product listings, the category tree, curated collections, product CSV
//! import/export and the keyword search endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← /catalog/{products,categories,collections}, /search
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Slugs, price/stock rules, category cycles, CSV rows, scoring
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Product/Category/Collection traits, in-memory and Postgres
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Product, Category, Collection, search hits, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_catalog::{handlers, CatalogService, InMemoryCatalog};
//!
//! let service = CatalogService::new(InMemoryCatalog::new());
//! let catalog = handlers::router(service.clone());
//! let search = handlers::search_router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod import_export;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod search;
pub mod service;

pub use error::{CatalogError, CatalogResult};
pub use models::{
    Category, CategoryNode, Collection, CreateCategory, CreateCollection, CreateProduct, Product,
    ProductFilter, ProductStatus, SearchHit, SearchKind, SearchResults, UpdateProduct,
};
pub use postgres::PgCatalogRepository;
pub use repository::{
    CatalogRepository, CategoryRepository, CollectionRepository, InMemoryCatalog,
    ProductRepository,
};
pub use service::CatalogService;
