use axum::Router;
use domain_content::{ContentService, PgContentRepository, handlers};

/// Blog posts, FAQs and the media library
pub fn router(state: &crate::state::AppState) -> Router {
    handlers::router(ContentService::new(PgContentRepository::new(state.db.clone())))
}
