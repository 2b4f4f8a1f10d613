//! Analytics Domain
//!
//! Read-only dashboard numbers: revenue summary, daily sales and best
//! sellers over a date range. Revenue counts orders that are paid,
//! fulfilled, shipped or delivered.

pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{AnalyticsError, AnalyticsResult};
pub use models::{DashboardSummary, DateRange, RangeQuery, SalesPoint, TopProduct};
pub use postgres::PgAnalyticsRepository;
pub use repository::{AnalyticsRepository, InMemoryAnalytics, OrderFact};
pub use service::AnalyticsService;
