use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Discount, DiscountKind};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: i64,
    pub min_subtotal_cents: i64,
    pub starts_at: DateTimeWithTimeZone,
    pub ends_at: Option<DateTimeWithTimeZone>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Discount {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            description: model.description,
            kind: model.kind,
            value: model.value,
            min_subtotal_cents: model.min_subtotal_cents,
            starts_at: model.starts_at.into(),
            ends_at: model.ends_at.map(Into::into),
            usage_limit: model.usage_limit,
            usage_count: model.usage_count,
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&Discount> for ActiveModel {
    fn from(discount: &Discount) -> Self {
        ActiveModel {
            id: Set(discount.id),
            code: Set(discount.code.clone()),
            description: Set(discount.description.clone()),
            kind: Set(discount.kind),
            value: Set(discount.value),
            min_subtotal_cents: Set(discount.min_subtotal_cents),
            starts_at: Set(discount.starts_at.into()),
            ends_at: Set(discount.ends_at.map(Into::into)),
            usage_limit: Set(discount.usage_limit),
            usage_count: Set(discount.usage_count),
            is_active: Set(discount.is_active),
            created_at: Set(discount.created_at.into()),
            updated_at: Set(discount.updated_at.into()),
        }
    }
}
