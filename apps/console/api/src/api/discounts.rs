use axum::Router;
use domain_discounts::{DiscountService, PgDiscountRepository, handlers};

pub fn router(state: &crate::state::AppState) -> Router {
    handlers::router(DiscountService::new(PgDiscountRepository::new(
        state.db.clone(),
    )))
}
