use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::csv_io::{CsvAttachment, ImportParams, ImportReport};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse, NotFoundResponse,
};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use chrono::Utc;
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;

use crate::entity::customer;
use crate::error::CustomerResult;
use crate::models::{CreateCustomer, Customer, CustomerFilter, UpdateCustomer};
use crate::repository::CustomerRepository;
use crate::service::CustomerService;

type Service<R> = State<Arc<CustomerService<R>>>;

#[utoipa::path(
    get,
    path = "",
    tag = customer::Model::TAG,
    params(CustomerFilter),
    responses(
        (status = 200, description = "Customers, newest first", body = Vec<Customer>)
    )
)]
pub(super) async fn list_customers<R: CustomerRepository>(
    State(service): Service<R>,
    Query(filter): Query<CustomerFilter>,
) -> CustomerResult<Json<Vec<Customer>>> {
    Ok(Json(service.list_customers(filter).await?))
}

#[utoipa::path(
    post,
    path = "",
    tag = customer::Model::TAG,
    request_body = CreateCustomer,
    responses(
        (status = 201, description = "Customer created", body = Customer),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse)
    )
)]
pub(super) async fn create_customer<R: CustomerRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreateCustomer>,
) -> CustomerResult<impl IntoResponse> {
    let customer = service.create_customer(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    get,
    path = "/export",
    tag = customer::Model::TAG,
    params(CustomerFilter),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv", body = String)
    )
)]
pub(super) async fn export_customers<R: CustomerRepository>(
    State(service): Service<R>,
    Query(filter): Query<CustomerFilter>,
) -> CustomerResult<CsvAttachment> {
    let body = service.export_customers(filter).await?;
    let filename = format!("customers-{}.csv", Utc::now().format("%Y%m%d"));
    Ok(CsvAttachment::new(filename, body))
}

#[utoipa::path(
    post,
    path = "/import",
    tag = customer::Model::TAG,
    params(ImportParams),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Per-row import report", body = ImportReport),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn import_customers<R: CustomerRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    Query(params): Query<ImportParams>,
    body: Bytes,
) -> CustomerResult<Json<ImportReport>> {
    let report = service.import_customers(&body, params.mode).await?;

    AuditEvent::by(&claims, "customer.import", "customers")
        .from_headers(&headers)
        .with_details(json!({
            "mode": params.mode,
            "created": report.created,
            "updated": report.updated,
            "skipped": report.skipped,
        }))
        .log();

    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = customer::Model::TAG,
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer found", body = Customer),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_customer<R: CustomerRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CustomerResult<Json<Customer>> {
    Ok(Json(service.get_customer(id).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = customer::Model::TAG,
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body = UpdateCustomer,
    responses(
        (status = 200, description = "Customer updated", body = Customer),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
pub(super) async fn update_customer<R: CustomerRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateCustomer>,
) -> CustomerResult<Json<Customer>> {
    Ok(Json(service.update_customer(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = customer::Model::TAG,
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 204, description = "Customer deleted; their orders keep the email"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn delete_customer<R: CustomerRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CustomerResult<StatusCode> {
    service.delete_customer(id).await?;

    AuditEvent::by(&claims, "customer.delete", format!("customer:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}
