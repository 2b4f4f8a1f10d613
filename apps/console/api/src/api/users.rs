use axum::Router;
use domain_users::{PgUserRepository, UserService, handlers};

pub fn router(state: &crate::state::AppState) -> Router {
    handlers::router(UserService::new(PgUserRepository::new(state.db.clone())))
}
