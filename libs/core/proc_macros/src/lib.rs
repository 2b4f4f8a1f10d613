// Re-export proc macros when their features are enabled
#[cfg(feature = "sea_orm_resource")]
pub use sea_orm_resource::SeaOrmResource;

/// REST resource metadata attached to a SeaORM entity model.
///
/// Derived with `SeaOrmResource`. Domain routers use `URL` when they are
/// nested into the console router and `TAG` to group their OpenAPI paths.
///
/// ```ignore
/// #[derive(DeriveEntityModel, SeaOrmResource)]
/// #[sea_orm(table_name = "blog_posts")]
/// pub struct Model { /* ... */ }
///
/// assert_eq!(Model::URL, "/blog-posts");
/// assert_eq!(Model::TAG, "Blog Posts");
/// ```
pub trait ApiResource {
    /// Router mount path, relative to `/api` (e.g. "/blog-posts")
    const URL: &'static str;
    /// `URL` with an `{id}` segment appended
    const URL_WITH_ID: &'static str;
    /// Database table name (e.g. "blog_posts")
    const COLLECTION: &'static str;
    /// OpenAPI tag (e.g. "Blog Posts")
    const TAG: &'static str;
}
