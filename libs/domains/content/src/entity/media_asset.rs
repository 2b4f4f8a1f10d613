use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{MediaAsset, MediaKind};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "media_assets")]
#[sea_orm_resource(url = "/media", tag = "Media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub file_name: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub alt_text: Option<String>,
    pub folder: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MediaAsset {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            kind: MediaKind::of(&model.mime_type),
            file_name: model.file_name,
            url: model.url,
            mime_type: model.mime_type,
            size_bytes: model.size_bytes,
            width: model.width,
            height: model.height,
            alt_text: model.alt_text,
            folder: model.folder,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&MediaAsset> for ActiveModel {
    fn from(asset: &MediaAsset) -> Self {
        ActiveModel {
            id: Set(asset.id),
            file_name: Set(asset.file_name.clone()),
            url: Set(asset.url.clone()),
            mime_type: Set(asset.mime_type.clone()),
            size_bytes: Set(asset.size_bytes),
            width: Set(asset.width),
            height: Set(asset.height),
            alt_text: Set(asset.alt_text.clone()),
            folder: Set(asset.folder.clone()),
            created_at: Set(asset.created_at.into()),
            updated_at: Set(asset.updated_at.into()),
        }
    }
}
