use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::Faq;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "faqs")]
#[sea_orm_resource(tag = "FAQs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub question: String,
    #[sea_orm(column_type = "Text")]
    pub answer: String,
    pub category: Option<String>,
    pub position: i32,
    pub is_published: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Faq {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            question: model.question,
            answer: model.answer,
            category: model.category,
            position: model.position,
            is_published: model.is_published,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&Faq> for ActiveModel {
    fn from(faq: &Faq) -> Self {
        ActiveModel {
            id: Set(faq.id),
            question: Set(faq.question.clone()),
            answer: Set(faq.answer.clone()),
            category: Set(faq.category.clone()),
            position: Set(faq.position),
            is_published: Set(faq.is_published),
            created_at: Set(faq.created_at.into()),
            updated_at: Set(faq.updated_at.into()),
        }
    }
}
