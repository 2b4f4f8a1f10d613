use axum_helpers::observability::{init_metrics, metrics_router};
use axum_helpers::server::{
    CleanupCoordinator, close_postgres, create_production_app, health_router,
};
use axum_helpers::{JwtRedisAuth, SharedAuthority, ShutdownCoordinator};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{PgUserRepository, UserService};
use std::sync::Arc;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    let metrics = init_metrics().map_err(|e| eyre::eyre!("Metrics recorder failed: {}", e))?;

    let postgres_future = async {
        database::postgres::connect_from_config_with_retry(config.database.clone(), None)
            .await
            .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))
    };

    let redis_future = async {
        database::redis::connect_from_config_with_retry(config.redis.clone(), None)
            .await
            .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))
    };

    let (db, redis) = tokio::try_join!(postgres_future, redis_future)?;

    database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name)
        .await
        .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;

    if let Some(admin) = &config.bootstrap_admin {
        let users = UserService::new(PgUserRepository::new(db.clone()));
        if let Some(user) = users
            .ensure_bootstrap_admin(&admin.email, &admin.password)
            .await
            .map_err(|e| eyre::eyre!("Bootstrap admin failed: {}", e))?
        {
            info!(user_id = %user.id, "Bootstrap admin created");
        }
    }

    let authority: SharedAuthority = Arc::new(JwtRedisAuth::new(redis.clone(), &config.jwt));

    let state = AppState {
        config,
        db,
        redis,
        authority,
        shutdown: ShutdownCoordinator::new(),
    };

    let router = axum_helpers::create_router::<openapi::ApiDoc>(
        api::routes(&state),
        &state.config.server,
    )?;

    // /health: liveness with app name and version
    // /ready: Postgres and Redis pings
    // /metrics: Prometheus scrape
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()))
        .merge(metrics_router(metrics));

    info!(
        "Starting {} with graceful shutdown ({:?} timeout)",
        state.config.app.name, state.config.server.shutdown_timeout
    );

    let server_config = state.config.server.clone();
    let coordinator = state.shutdown.clone();
    create_production_app(app, &server_config, coordinator, async move {
        let mut cleanup = CleanupCoordinator::new();
        cleanup.add_task("postgres", close_postgres(state.db, "console"));
        cleanup.add_task("redis", async move {
            // ConnectionManager closes on drop
            drop(state.redis);
            info!("Redis connection closed");
        });
        cleanup.run().await;
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Console API shutdown complete");
    Ok(())
}
