use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};

use crate::state::AppState;

/// Readiness: Postgres and Redis must both answer a ping
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![
        (
            "database",
            Box::pin(async {
                database::postgres::check_health(&state.db)
                    .await
                    .map_err(|e| format!("Database ping failed: {}", e))
            }),
        ),
        (
            "redis",
            Box::pin(async {
                let mut redis = state.redis.clone();
                database::redis::check_health(&mut redis)
                    .await
                    .map_err(|e| format!("Redis ping failed: {}", e))
            }),
        ),
    ];

    run_health_checks(checks).await.into_response()
}
