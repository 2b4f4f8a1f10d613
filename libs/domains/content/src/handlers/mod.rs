mod faqs;
mod media;
mod posts;

use axum::{
    Router,
    routing::{get, post},
};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, InternalServerErrorResponse,
    NotFoundResponse, UnauthorizedResponse,
};
use core_proc_macros::ApiResource;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::entity::{blog_post, faq, media_asset};
use crate::models::{
    BlogPost, CreateFaq, CreatePost, Faq, MediaAsset, MediaKind, PostStatus, RegisterMedia,
    ReorderFaqs, UpdateFaq, UpdateMedia, UpdatePost,
};
use crate::repository::ContentRepository;
use crate::service::ContentService;

#[derive(OpenApi)]
#[openapi(
    paths(
        posts::list_posts,
        posts::create_post,
        posts::get_post,
        posts::get_post_by_slug,
        posts::update_post,
        posts::delete_post,
        posts::publish_post,
        posts::unpublish_post,
        posts::archive_post,
        faqs::list_faqs,
        faqs::create_faq,
        faqs::reorder_faqs,
        faqs::get_faq,
        faqs::update_faq,
        faqs::delete_faq,
        media::list_media,
        media::register_media,
        media::get_media,
        media::update_media,
        media::delete_media,
    ),
    components(
        schemas(
            BlogPost, PostStatus, CreatePost, UpdatePost,
            Faq, CreateFaq, UpdateFaq, ReorderFaqs,
            MediaAsset, MediaKind, RegisterMedia, UpdateMedia
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            UnauthorizedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = blog_post::Model::TAG, description = "Blog posts and their publishing state"),
        (name = faq::Model::TAG, description = "Frequently asked questions"),
        (name = media_asset::Model::TAG, description = "Metadata of uploaded images, videos and documents")
    )
)]
pub struct ApiDoc;

/// Posts, FAQs and media, mounted under `/content`
pub fn router<R: ContentRepository + 'static>(service: ContentService<R>) -> Router {
    Router::new()
        .route(
            blog_post::Model::URL,
            get(posts::list_posts).post(posts::create_post),
        )
        .route("/posts/by-slug/{slug}", get(posts::get_post_by_slug))
        .route(
            blog_post::Model::URL_WITH_ID,
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/publish", post(posts::publish_post))
        .route("/posts/{id}/unpublish", post(posts::unpublish_post))
        .route("/posts/{id}/archive", post(posts::archive_post))
        .route(faq::Model::URL, get(faqs::list_faqs).post(faqs::create_faq))
        .route("/faqs/reorder", post(faqs::reorder_faqs))
        .route(
            faq::Model::URL_WITH_ID,
            get(faqs::get_faq)
                .patch(faqs::update_faq)
                .delete(faqs::delete_faq),
        )
        .route(
            media_asset::Model::URL,
            get(media::list_media).post(media::register_media),
        )
        .route(
            media_asset::Model::URL_WITH_ID,
            get(media::get_media)
                .patch(media::update_media)
                .delete(media::delete_media),
        )
        .with_state(Arc::new(service))
}
