use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::Collection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "collections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub image_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::collection_product::Entity")]
    Memberships,
}

impl Related<super::collection_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// `product_count` is not a column; callers count memberships separately
    pub fn into_collection(self, product_count: i64) -> Collection {
        Collection {
            id: self.id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            image_url: self.image_url,
            is_published: self.is_published,
            product_count,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        }
    }
}

impl From<&Collection> for ActiveModel {
    fn from(collection: &Collection) -> Self {
        ActiveModel {
            id: Set(collection.id),
            title: Set(collection.title.clone()),
            slug: Set(collection.slug.clone()),
            description: Set(collection.description.clone()),
            image_url: Set(collection.image_url.clone()),
            is_published: Set(collection.is_published),
            created_at: Set(collection.created_at.into()),
            updated_at: Set(collection.updated_at.into()),
        }
    }
}
