use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{ContactMessage, ContactStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "contact_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub status: ContactStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ContactMessage {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            subject: model.subject,
            body: model.body,
            status: model.status,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&ContactMessage> for ActiveModel {
    fn from(message: &ContactMessage) -> Self {
        ActiveModel {
            id: Set(message.id),
            name: Set(message.name.clone()),
            email: Set(message.email.clone()),
            subject: Set(message.subject.clone()),
            body: Set(message.body.clone()),
            status: Set(message.status),
            created_at: Set(message.created_at.into()),
            updated_at: Set(message.updated_at.into()),
        }
    }
}
