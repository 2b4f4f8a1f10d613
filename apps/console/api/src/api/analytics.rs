use axum::Router;
use domain_analytics::{AnalyticsService, PgAnalyticsRepository, handlers};

pub fn router(state: &crate::state::AppState) -> Router {
    handlers::router(AnalyticsService::new(PgAnalyticsRepository::new(
        state.db.clone(),
    )))
}
