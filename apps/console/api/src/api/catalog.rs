use domain_catalog::{CatalogService, PgCatalogRepository};

/// Shared by `/catalog` and `/search`
pub fn service(state: &crate::state::AppState) -> CatalogService<PgCatalogRepository> {
    CatalogService::new(PgCatalogRepository::new(state.db.clone()))
}
