use axum::Router;
use domain_users::{AuthState, PgUserRepository, UserService, auth_handlers};

/// `/auth/login`, `/logout`, `/refresh`, `/me`
pub fn router(state: &crate::state::AppState) -> Router {
    let service = UserService::new(PgUserRepository::new(state.db.clone()));

    auth_handlers::router(AuthState {
        service,
        authority: state.authority.clone(),
        secure_cookies: state.config.environment.use_https(),
    })
}
