//! Orders Domain
//!
//! Placed orders, their fulfilment status machine and CSV export.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← /orders CRUD, /orders/{id}/status, /orders/export
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Totals, status transitions, delete rules, CSV
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Trait + in-memory and Postgres implementations
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Order, OrderItem, Address, OrderStatus
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_orders::{handlers, InMemoryOrders, OrderService};
//!
//! let service = OrderService::new(InMemoryOrders::new());
//! let router = handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{OrderError, OrderResult};
pub use models::{
    Address, CreateOrder, Order, OrderFilter, OrderItem, OrderStatus, TransitionOrder,
    UpdateOrder,
};
pub use postgres::PgOrderRepository;
pub use repository::{InMemoryOrders, OrderRepository};
pub use service::OrderService;
