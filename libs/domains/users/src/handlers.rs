use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    AuditEvent, JwtClaims, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::entity;
use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, Role, UpdateUser, User, UserFilter};
use crate::repository::UserRepository;
use crate::service::UserService;

#[derive(OpenApi)]
#[openapi(
    paths(list_users, create_user, get_user, update_user, delete_user),
    components(
        schemas(User, CreateUser, UpdateUser, UserFilter, Role),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = entity::Model::TAG, description = "Staff account management (admin only)")
    )
)]
pub struct ApiDoc;

/// Staff account CRUD. Expects the admin gate to be layered on by the caller.
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).patch(update_user).delete(delete_user))
        .with_state(Arc::new(service))
}

#[utoipa::path(
    get,
    path = "",
    tag = entity::Model::TAG,
    params(UserFilter),
    responses(
        (status = 200, description = "Staff accounts", body = Vec<User>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Query(filter): Query<UserFilter>,
) -> UserResult<Json<Vec<User>>> {
    Ok(Json(service.list_users(filter).await?))
}

#[utoipa::path(
    post,
    path = "",
    tag = entity::Model::TAG,
    request_body = CreateUser,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;

    AuditEvent::by(&claims, "user.create", format!("user:{}", user.id))
        .from_headers(&headers)
        .with_details(json!({ "email": user.email, "roles": user.roles }))
        .log();

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account found", body = User),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    UuidPath(id): UuidPath,
) -> UserResult<Json<User>> {
    Ok(Json(service.get_user(id).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> UserResult<Json<User>> {
    let details = json!({
        "roles": input.roles,
        "is_active": input.is_active,
        "password_changed": input.password.is_some(),
    });
    let user = service.update_user(id, input).await?;

    AuditEvent::by(&claims, "user.update", format!("user:{}", id))
        .from_headers(&headers)
        .with_details(details)
        .log();

    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> UserResult<StatusCode> {
    if claims.user_id() == Some(id) {
        return Err(UserError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    service.delete_user(id).await?;

    AuditEvent::by(&claims, "user.delete", format!("user:{}", id))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}
