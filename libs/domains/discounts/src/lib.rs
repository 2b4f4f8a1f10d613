//! Discounts Domain
//!
//! Discount codes (percentage, fixed amount, free shipping) with quoting
//! against a cart and atomic redemption.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_discounts::{handlers, DiscountService, InMemoryDiscounts};
//!
//! let router = handlers::router(DiscountService::new(InMemoryDiscounts::new()));
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{DiscountError, DiscountResult};
pub use models::{
    CreateDiscount, Discount, DiscountFilter, DiscountKind, DiscountQuote, RejectReason,
    UpdateDiscount,
};
pub use postgres::PgDiscountRepository;
pub use repository::{DiscountRepository, InMemoryDiscounts};
pub use service::DiscountService;
