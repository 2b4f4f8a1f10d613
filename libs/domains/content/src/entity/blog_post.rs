use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{BlogPost, PostStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "blog_posts")]
#[sea_orm_resource(url = "/posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub excerpt: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub cover_image_url: Option<String>,
    pub author_name: Option<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub published_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for BlogPost {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            slug: model.slug,
            excerpt: model.excerpt,
            body: model.body,
            cover_image_url: model.cover_image_url,
            author_name: model.author_name,
            tags: model.tags,
            status: model.status,
            published_at: model.published_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&BlogPost> for ActiveModel {
    fn from(post: &BlogPost) -> Self {
        ActiveModel {
            id: Set(post.id),
            title: Set(post.title.clone()),
            slug: Set(post.slug.clone()),
            excerpt: Set(post.excerpt.clone()),
            body: Set(post.body.clone()),
            cover_image_url: Set(post.cover_image_url.clone()),
            author_name: Set(post.author_name.clone()),
            tags: Set(post.tags.clone()),
            status: Set(post.status),
            published_at: Set(post.published_at.map(Into::into)),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
        }
    }
}
