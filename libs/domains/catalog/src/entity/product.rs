use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Product, ProductImage, ProductStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub price_cents: i64,
    pub compare_at_price_cents: Option<i64>,
    pub currency: String,
    pub stock: i32,
    pub status: ProductStatus,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        // Malformed image JSON degrades to no images rather than failing the read
        let images: Vec<ProductImage> = serde_json::from_value(model.images).unwrap_or_default();

        Self {
            id: model.id,
            title: model.title,
            slug: model.slug,
            sku: model.sku,
            description: model.description,
            price_cents: model.price_cents,
            compare_at_price_cents: model.compare_at_price_cents,
            currency: model.currency,
            stock: model.stock,
            status: model.status,
            category_id: model.category_id,
            tags: model.tags,
            images,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&Product> for ActiveModel {
    fn from(product: &Product) -> Self {
        ActiveModel {
            id: Set(product.id),
            title: Set(product.title.clone()),
            slug: Set(product.slug.clone()),
            sku: Set(product.sku.clone()),
            description: Set(product.description.clone()),
            price_cents: Set(product.price_cents),
            compare_at_price_cents: Set(product.compare_at_price_cents),
            currency: Set(product.currency.clone()),
            stock: Set(product.stock),
            status: Set(product.status),
            category_id: Set(product.category_id),
            tags: Set(product.tags.clone()),
            images: Set(serde_json::to_value(&product.images).unwrap_or_default()),
            created_at: Set(product.created_at.into()),
            updated_at: Set(product.updated_at.into()),
        }
    }
}
