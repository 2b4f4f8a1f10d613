use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
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
use crate::error::DiscountResult;
use crate::models::{
    CreateDiscount, Discount, DiscountFilter, DiscountKind, DiscountQuote, QuoteRequest,
    RedeemRequest, RejectReason, UpdateDiscount,
};
use crate::repository::DiscountRepository;
use crate::service::DiscountService;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_discounts,
        create_discount,
        get_discount,
        update_discount,
        delete_discount,
        quote,
        redeem
    ),
    components(
        schemas(
            Discount, DiscountKind, CreateDiscount, UpdateDiscount, QuoteRequest, RedeemRequest,
            DiscountQuote, RejectReason
        ),
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
        (name = entity::Model::TAG, description = "Discount codes, quotes and redemption")
    )
)]
pub struct ApiDoc;

type Service<R> = State<Arc<DiscountService<R>>>;

/// Mounted under `/discounts`
pub fn router<R: DiscountRepository + 'static>(service: DiscountService<R>) -> Router {
    Router::new()
        .route("/", get(list_discounts).post(create_discount))
        .route("/quote", post(quote))
        .route("/redeem", post(redeem))
        .route(
            "/{id}",
            get(get_discount)
                .patch(update_discount)
                .delete(delete_discount),
        )
        .with_state(Arc::new(service))
}

#[utoipa::path(
    get,
    path = "",
    tag = entity::Model::TAG,
    params(DiscountFilter),
    responses(
        (status = 200, description = "Discounts, newest first", body = Vec<Discount>)
    )
)]
async fn list_discounts<R: DiscountRepository>(
    State(service): Service<R>,
    Query(filter): Query<DiscountFilter>,
) -> DiscountResult<Json<Vec<Discount>>> {
    Ok(Json(service.list_discounts(filter).await?))
}

#[utoipa::path(
    post,
    path = "",
    tag = entity::Model::TAG,
    request_body = CreateDiscount,
    responses(
        (status = 201, description = "Discount created", body = Discount),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn create_discount<R: DiscountRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreateDiscount>,
) -> DiscountResult<impl IntoResponse> {
    let discount = service.create_discount(input).await?;
    Ok((StatusCode::CREATED, Json(discount)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "Discount ID")),
    responses(
        (status = 200, description = "Discount found", body = Discount),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_discount<R: DiscountRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> DiscountResult<Json<Discount>> {
    Ok(Json(service.get_discount(id).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "Discount ID")),
    request_body = UpdateDiscount,
    responses(
        (status = 200, description = "Discount updated", body = Discount),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn update_discount<R: DiscountRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateDiscount>,
) -> DiscountResult<Json<Discount>> {
    Ok(Json(service.update_discount(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "Discount ID")),
    responses(
        (status = 204, description = "Discount deleted"),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn delete_discount<R: DiscountRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> DiscountResult<StatusCode> {
    service.delete_discount(id).await?;

    AuditEvent::by(&claims, "discount.delete", format!("discount:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/quote",
    tag = entity::Model::TAG,
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Discount that would apply right now", body = DiscountQuote),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = UnprocessableResponse)
    )
)]
async fn quote<R: DiscountRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<QuoteRequest>,
) -> DiscountResult<Json<DiscountQuote>> {
    let quote = service
        .quote(&input.code, input.subtotal_cents, input.shipping_cents, Utc::now())
        .await?;
    Ok(Json(quote))
}

#[utoipa::path(
    post,
    path = "/redeem",
    tag = entity::Model::TAG,
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Use counted", body = Discount),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = UnprocessableResponse)
    )
)]
async fn redeem<R: DiscountRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<RedeemRequest>,
) -> DiscountResult<Json<Discount>> {
    let discount = service.redeem(&input.code).await?;

    AuditEvent::by(&claims, "discount.redeem", format!("discount:{}", discount.id))
        .from_headers(&headers)
        .with_details(json!({ "code": discount.code, "usage_count": discount.usage_count }))
        .log();

    Ok(Json(discount))
}
