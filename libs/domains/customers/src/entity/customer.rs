use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::Customer;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub accepts_marketing: bool,
    pub tags: Vec<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Customer {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            phone: model.phone,
            accepts_marketing: model.accepts_marketing,
            tags: model.tags,
            note: model.note,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&Customer> for ActiveModel {
    fn from(customer: &Customer) -> Self {
        ActiveModel {
            id: Set(customer.id),
            email: Set(customer.email.clone()),
            first_name: Set(customer.first_name.clone()),
            last_name: Set(customer.last_name.clone()),
            phone: Set(customer.phone.clone()),
            accepts_marketing: Set(customer.accepts_marketing),
            tags: Set(customer.tags.clone()),
            note: Set(customer.note.clone()),
            created_at: Set(customer.created_at.into()),
            updated_at: Set(customer.updated_at.into()),
        }
    }
}
