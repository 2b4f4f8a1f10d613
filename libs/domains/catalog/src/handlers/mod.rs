mod categories;
mod collections;
mod products;
mod search;

use axum::{
    Router,
    routing::{delete, get, post},
};
use axum_helpers::csv_io::{ImportMode, ImportReport, RowError};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
    InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse, UnprocessableResponse,
};
use core_proc_macros::ApiResource;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::entity::{category, collection, product};
use crate::models::{
    AddProducts, AdjustStock, Category, CategoryNode, Collection, CreateCategory,
    CreateCollection, CreateProduct, MembershipChange, Product, ProductImage, ProductStatus,
    SearchHit, SearchKind, SearchResults, UpdateCategory, UpdateCollection, UpdateProduct,
};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

pub const SEARCH_TAG: &str = "Search";

#[derive(OpenApi)]
#[openapi(
    paths(
        products::list_products,
        products::create_product,
        products::get_product,
        products::get_product_by_slug,
        products::update_product,
        products::delete_product,
        products::adjust_stock,
        products::publish_product,
        products::archive_product,
        products::low_stock,
        products::export_products,
        products::import_products,
        categories::list_categories,
        categories::create_category,
        categories::category_tree,
        categories::get_category,
        categories::update_category,
        categories::delete_category,
        collections::list_collections,
        collections::create_collection,
        collections::get_collection,
        collections::update_collection,
        collections::delete_collection,
        collections::list_collection_products,
        collections::add_products,
        collections::remove_product,
    ),
    components(
        schemas(
            Product, ProductImage, ProductStatus, CreateProduct, UpdateProduct, AdjustStock,
            Category, CategoryNode, CreateCategory, UpdateCategory,
            Collection, CreateCollection, UpdateCollection, AddProducts, MembershipChange,
            ImportMode, ImportReport, RowError
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            UnprocessableResponse,
            UnauthorizedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = product::Model::TAG, description = "Product listings, stock and CSV import/export"),
        (name = category::Model::TAG, description = "Hierarchical product categories"),
        (name = collection::Model::TAG, description = "Curated product collections")
    )
)]
pub struct ApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(search::search),
    components(schemas(SearchResults, SearchHit, SearchKind)),
    tags((name = SEARCH_TAG, description = "Keyword search across the catalog"))
)]
pub struct SearchApiDoc;

/// Products, categories and collections, mounted under `/catalog`
pub fn router<R: CatalogRepository + 'static>(service: CatalogService<R>) -> Router {
    Router::new()
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/export", get(products::export_products))
        .route("/products/import", post(products::import_products))
        .route("/products/low-stock", get(products::low_stock))
        .route("/products/by-slug/{slug}", get(products::get_product_by_slug))
        .route(
            "/products/{id}",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/{id}/stock", post(products::adjust_stock))
        .route("/products/{id}/publish", post(products::publish_product))
        .route("/products/{id}/archive", post(products::archive_product))
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/tree", get(categories::category_tree))
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/collections/{id}",
            get(collections::get_collection)
                .patch(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route(
            "/collections/{id}/products",
            get(collections::list_collection_products).post(collections::add_products),
        )
        .route(
            "/collections/{id}/products/{product_id}",
            delete(collections::remove_product),
        )
        .with_state(Arc::new(service))
}

/// `GET /` keyword search, mounted under `/search`
pub fn search_router<R: CatalogRepository + 'static>(service: CatalogService<R>) -> Router {
    Router::new()
        .route("/", get(search::search))
        .with_state(Arc::new(service))
}
