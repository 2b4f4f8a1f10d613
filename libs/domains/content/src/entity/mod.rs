pub mod blog_post;
pub mod faq;
pub mod media_asset;
