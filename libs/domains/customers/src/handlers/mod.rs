mod contact;
mod customers;

use axum::{
    Router,
    routing::{get, post},
};
use axum_helpers::csv_io::{ImportMode, ImportReport, RowError};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
    InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
};
use core_proc_macros::ApiResource;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::entity::{contact_message, customer};
use crate::models::{
    ContactMessage, ContactStatus, CreateCustomer, Customer, SetContactStatus, SubmitContact,
    UnreadCount, UpdateCustomer,
};
use crate::repository::{ContactRepository, CustomerRepository};
use crate::service::{ContactService, CustomerService};

#[derive(OpenApi)]
#[openapi(
    paths(
        customers::list_customers,
        customers::create_customer,
        customers::export_customers,
        customers::import_customers,
        customers::get_customer,
        customers::update_customer,
        customers::delete_customer,
    ),
    components(
        schemas(Customer, CreateCustomer, UpdateCustomer, ImportMode, ImportReport, RowError),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            UnauthorizedResponse,
            InternalServerErrorResponse
        )
    ),
    tags((name = customer::Model::TAG, description = "Customer records and CSV import/export"))
)]
pub struct ApiDoc;

/// Staff side of the contact form inbox
#[derive(OpenApi)]
#[openapi(
    paths(
        contact::list_messages,
        contact::unread_count,
        contact::get_message,
        contact::set_status,
        contact::delete_message,
    ),
    components(
        schemas(ContactMessage, ContactStatus, SetContactStatus, UnreadCount),
        responses(NotFoundResponse, BadRequestUuidResponse, UnauthorizedResponse)
    ),
    tags((name = contact_message::Model::TAG, description = "Storefront contact form inbox"))
)]
pub struct ContactApiDoc;

/// The unauthenticated contact form
#[derive(OpenApi)]
#[openapi(
    paths(contact::submit),
    components(schemas(SubmitContact, ContactMessage, ContactStatus))
)]
pub struct PublicContactApiDoc;

/// Mounted under `/customers`
pub fn router<R: CustomerRepository + 'static>(service: CustomerService<R>) -> Router {
    Router::new()
        .route(
            "/",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route("/export", get(customers::export_customers))
        .route("/import", post(customers::import_customers))
        .route(
            "/{id}",
            get(customers::get_customer)
                .patch(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .with_state(Arc::new(service))
}

/// Staff inbox, mounted under `/contact-messages`
pub fn contact_router<R: ContactRepository + 'static>(service: ContactService<R>) -> Router {
    Router::new()
        .route("/", get(contact::list_messages))
        .route("/unread-count", get(contact::unread_count))
        .route(
            "/{id}",
            get(contact::get_message).delete(contact::delete_message),
        )
        .route("/{id}/status", post(contact::set_status))
        .with_state(Arc::new(service))
}

/// Unauthenticated form endpoint, mounted under `/contact`
pub fn public_contact_router<R: ContactRepository + 'static>(
    service: ContactService<R>,
) -> Router {
    Router::new()
        .route("/", post(contact::submit))
        .with_state(Arc::new(service))
}
