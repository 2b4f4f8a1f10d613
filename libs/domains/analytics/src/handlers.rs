use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use axum_helpers::ValidatedQuery;
use axum_helpers::errors::responses::{
    BadRequestValidationResponse, InternalServerErrorResponse, UnauthorizedResponse,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::AnalyticsResult;
use crate::models::{
    DashboardSummary, DateRange, RangeQuery, SalesPoint, TopProduct, TopProductsQuery,
};
use crate::repository::AnalyticsRepository;
use crate::service::AnalyticsService;

pub const ANALYTICS_TAG: &str = "Analytics";

#[derive(OpenApi)]
#[openapi(
    paths(summary, sales, top_products),
    components(
        schemas(DashboardSummary, DateRange, SalesPoint, TopProduct),
        responses(BadRequestValidationResponse, UnauthorizedResponse, InternalServerErrorResponse)
    ),
    tags((name = ANALYTICS_TAG, description = "Dashboard aggregates"))
)]
pub struct ApiDoc;

type Service<R> = State<Arc<AnalyticsService<R>>>;

/// Mounted under `/analytics`
pub fn router<R: AnalyticsRepository + 'static>(service: AnalyticsService<R>) -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/sales", get(sales))
        .route("/top-products", get(top_products))
        .with_state(Arc::new(service))
}

#[utoipa::path(
    get,
    path = "/summary",
    tag = ANALYTICS_TAG,
    params(RangeQuery),
    responses(
        (status = 200, description = "Headline numbers for the range", body = DashboardSummary),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn summary<R: AnalyticsRepository>(
    State(service): Service<R>,
    Query(query): Query<RangeQuery>,
) -> AnalyticsResult<Json<DashboardSummary>> {
    Ok(Json(service.summary(query).await?))
}

#[utoipa::path(
    get,
    path = "/sales",
    tag = ANALYTICS_TAG,
    params(RangeQuery),
    responses(
        (status = 200, description = "One point per day, zero when nothing sold", body = Vec<SalesPoint>),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn sales<R: AnalyticsRepository>(
    State(service): Service<R>,
    Query(query): Query<RangeQuery>,
) -> AnalyticsResult<Json<Vec<SalesPoint>>> {
    Ok(Json(service.sales(query).await?))
}

#[utoipa::path(
    get,
    path = "/top-products",
    tag = ANALYTICS_TAG,
    params(TopProductsQuery),
    responses(
        (status = 200, description = "Best sellers by units", body = Vec<TopProduct>),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
async fn top_products<R: AnalyticsRepository>(
    State(service): Service<R>,
    ValidatedQuery(query): ValidatedQuery<TopProductsQuery>,
) -> AnalyticsResult<Json<Vec<TopProduct>>> {
    Ok(Json(service.top_products(query).await?))
}
