use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::not_found;
use crate::http::{cors_layer_from_env, security_headers};
use crate::observability::track_requests;
use axum::{Router, extract::DefaultBodyLimit, middleware};
use core_config::server::ServerConfig;
use std::io;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;

/// Wraps the API routes with the docs UIs and the shared layers.
///
/// - OpenAPI: `/swagger-ui`, `/redoc`, `/rapidoc`, `/scalar`, spec at `/api-docs/openapi.json`
/// - `apis` nested under `/api`, JSON 404 fallback
/// - request tracing and metrics, security headers, CORS (`CORS_ALLOWED_ORIGIN`, required),
///   compression, request timeout and body size limit from `server_config`
///
/// Domain routers apply their own state before being passed in.
pub fn create_router<T>(apis: Router, server_config: &ServerConfig) -> io::Result<Router>
where
    T: OpenApi + 'static,
{
    use utoipa_rapidoc::RapiDoc;
    use utoipa_redoc::{Redoc, Servable as RedocServable};
    use utoipa_scalar::{Scalar, Servable as ScalarServable};
    use utoipa_swagger_ui::SwaggerUi;

    let cors = cors_layer_from_env()?;

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", T::openapi()))
        .merge(Redoc::with_url("/redoc", T::openapi()))
        .merge(RapiDoc::new("/api-docs/openapi.json").path("/rapidoc"))
        .merge(Scalar::with_url("/scalar", T::openapi()))
        .nest("/api", apis)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(server_config.max_body_bytes))
        .layer(TimeoutLayer::new(server_config.request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(track_requests))
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .layer(CompressionLayer::new());

    Ok(router)
}

/// Serves `router` with coordinated shutdown.
///
/// On SIGINT/SIGTERM the coordinator notifies its subscribers (the messaging
/// hub closes its sockets), in-flight requests drain, then `cleanup` runs
/// with `server_config.shutdown_timeout` as its deadline.
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    coordinator: ShutdownCoordinator,
    cleanup: F,
) -> io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let shutdown_timeout: Duration = server_config.shutdown_timeout;
    let mut shutdown_rx = coordinator.subscribe();
    let cleanup_handle = tokio::spawn(async move {
        let _ = shutdown_rx.recv().await;

        info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
        match tokio::time::timeout(shutdown_timeout, cleanup).await {
            Ok(()) => info!("Cleanup completed successfully"),
            Err(_) => tracing::warn!(
                "Cleanup exceeded timeout of {:?}, forcing shutdown",
                shutdown_timeout
            ),
        }
    });

    let signal_coordinator = coordinator.clone();
    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { signal_coordinator.wait_for_signal().await })
        .await
        .inspect_err(|e| tracing::error!("Server encountered an error: {:?}", e));

    // Server stopped for another reason; still release resources
    coordinator.shutdown();
    cleanup_handle.await.ok();

    serve_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi(info(title = "test"))]
    struct EmptyDoc;

    fn build() -> Router {
        temp_env::with_var("CORS_ALLOWED_ORIGIN", Some("http://localhost:5173"), || {
            create_router::<EmptyDoc>(
                Router::new().route("/ping", get(|| async { "pong" })),
                &ServerConfig::default(),
            )
            .unwrap()
        })
    }

    #[tokio::test]
    async fn test_api_routes_nested() {
        let response = build()
            .oneshot(Request::get("/api/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = build()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "application/json");
    }

    #[test]
    fn test_missing_cors_env_fails() {
        temp_env::with_var_unset("CORS_ALLOWED_ORIGIN", || {
            assert!(create_router::<EmptyDoc>(Router::new(), &ServerConfig::default()).is_err());
        });
    }
}
