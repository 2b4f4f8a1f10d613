//! Customers Domain
//!
//! Customer records with CSV import/export, and the storefront contact form
//! inbox.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_customers::{handlers, ContactService, CustomerService};
//! use domain_customers::{InMemoryContactMessages, InMemoryCustomers};
//!
//! let customers = handlers::router(CustomerService::new(InMemoryCustomers::new()));
//! let contact = ContactService::new(InMemoryContactMessages::new());
//! let inbox = handlers::contact_router(contact.clone());
//! let form = handlers::public_contact_router(contact);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod import_export;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{CustomerError, CustomerResult};
pub use models::{
    ContactFilter, ContactMessage, ContactStatus, CreateCustomer, Customer, CustomerFilter,
    SubmitContact, UnreadCount, UpdateCustomer,
};
pub use postgres::{PgContactRepository, PgCustomerRepository};
pub use repository::{
    ContactRepository, CustomerRepository, InMemoryContactMessages, InMemoryCustomers,
};
pub use service::{ContactService, CustomerService};
