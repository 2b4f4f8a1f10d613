use axum::Router;
use domain_orders::{OrderService, PgOrderRepository, handlers};

pub fn router(state: &crate::state::AppState) -> Router {
    handlers::router(OrderService::new(PgOrderRepository::new(state.db.clone())))
}
