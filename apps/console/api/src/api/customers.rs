use axum::Router;
use domain_customers::{
    ContactService, CustomerService, PgContactRepository, PgCustomerRepository, handlers,
};

pub fn router(state: &crate::state::AppState) -> Router {
    handlers::router(CustomerService::new(PgCustomerRepository::new(
        state.db.clone(),
    )))
}

/// Shared by the staff inbox and the public form
pub fn contact_service(state: &crate::state::AppState) -> ContactService<PgContactRepository> {
    ContactService::new(PgContactRepository::new(state.db.clone()))
}
