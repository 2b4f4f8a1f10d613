use core_proc_macros::ApiResource;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Storefront Console API",
        version = "0.1.0",
        description = "Admin console for catalog, orders, customers, content, discounts and analytics, plus live support messaging"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/auth", api = domain_users::auth_handlers::ApiDoc),
        (path = domain_users::entity::Model::URL, api = domain_users::handlers::ApiDoc),
        (path = "/catalog", api = domain_catalog::handlers::ApiDoc),
        (path = "/search", api = domain_catalog::handlers::SearchApiDoc),
        (path = domain_orders::entity::Model::URL, api = domain_orders::handlers::ApiDoc),
        (path = "/content", api = domain_content::handlers::ApiDoc),
        (path = domain_customers::entity::customer::Model::URL, api = domain_customers::handlers::ApiDoc),
        (path = domain_customers::entity::contact_message::Model::URL, api = domain_customers::handlers::ContactApiDoc),
        (path = "/contact", api = domain_customers::handlers::PublicContactApiDoc),
        (path = domain_discounts::entity::Model::URL, api = domain_discounts::handlers::ApiDoc),
        (path = "/analytics", api = domain_analytics::handlers::ApiDoc),
        (path = "/messaging", api = domain_messaging::handlers::ApiDoc),
        (path = "/support", api = domain_messaging::handlers::SupportApiDoc)
    )
)]
pub struct ApiDoc;
