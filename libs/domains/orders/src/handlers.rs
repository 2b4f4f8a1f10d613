use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::csv_io::CsvAttachment;
use axum_helpers::{
    AuditEvent, JwtClaims, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
        UnprocessableResponse,
    },
};
use chrono::Utc;
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::entity;
use crate::error::OrderResult;
use crate::models::{
    Address, CreateOrder, Order, OrderFilter, OrderItem, OrderStatus, TransitionOrder,
    UpdateOrder,
};
use crate::repository::OrderRepository;
use crate::service::OrderService;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_orders,
        create_order,
        export_orders,
        get_order,
        update_order,
        delete_order,
        transition_order
    ),
    components(
        schemas(Order, OrderItem, Address, OrderStatus, CreateOrder, UpdateOrder, TransitionOrder),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            UnprocessableResponse,
            UnauthorizedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = entity::Model::TAG, description = "Orders, fulfilment status and CSV export")
    )
)]
pub struct ApiDoc;

type Service<R> = State<Arc<OrderService<R>>>;

/// Mounted under `/orders`
pub fn router<R: OrderRepository + 'static>(service: OrderService<R>) -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/export", get(export_orders))
        .route(
            "/{id}",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/{id}/status", post(transition_order))
        .with_state(Arc::new(service))
}

#[utoipa::path(
    get,
    path = "",
    tag = entity::Model::TAG,
    params(OrderFilter),
    responses(
        (status = 200, description = "Orders, newest first", body = Vec<Order>),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn list_orders<R: OrderRepository>(
    State(service): Service<R>,
    Query(filter): Query<OrderFilter>,
) -> OrderResult<Json<Vec<Order>>> {
    Ok(Json(service.list_orders(filter).await?))
}

#[utoipa::path(
    post,
    path = "",
    tag = entity::Model::TAG,
    request_body = CreateOrder,
    responses(
        (status = 201, description = "Order placed; totals and number are assigned by the server", body = Order),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn create_order<R: OrderRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreateOrder>,
) -> OrderResult<impl IntoResponse> {
    let order = service.create_order(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/export",
    tag = entity::Model::TAG,
    params(OrderFilter),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv", body = String),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn export_orders<R: OrderRepository>(
    State(service): Service<R>,
    Query(filter): Query<OrderFilter>,
) -> OrderResult<CsvAttachment> {
    let body = service.export_orders(filter).await?;
    let filename = format!("orders-{}.csv", Utc::now().format("%Y%m%d"));
    Ok(CsvAttachment::new(filename, body))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_order<R: OrderRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.get_order(id).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrder,
    responses(
        (status = 200, description = "Note or shipping address updated", body = Order),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_order<R: OrderRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    Json(input): Json<UpdateOrder>,
) -> OrderResult<Json<Order>> {
    Ok(Json(service.update_order(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn delete_order<R: OrderRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> OrderResult<StatusCode> {
    service.delete_order(id).await?;

    AuditEvent::by(&claims, "order.delete", format!("order:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/status",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = TransitionOrder,
    responses(
        (status = 200, description = "Status changed", body = Order),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = UnprocessableResponse)
    )
)]
async fn transition_order<R: OrderRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    Json(input): Json<TransitionOrder>,
) -> OrderResult<Json<Order>> {
    let order = service.transition(id, input.status).await?;

    AuditEvent::by(&claims, "order.transition", format!("order:{id}"))
        .from_headers(&headers)
        .with_details(json!({ "status": order.status, "number": order.number }))
        .log();

    Ok(Json(order))
}
