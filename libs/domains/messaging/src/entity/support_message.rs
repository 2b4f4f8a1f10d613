use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Attachment, Message, ParticipantRole};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "support_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: ParticipantRole,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub attachments: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Message {
    fn from(model: Model) -> Self {
        let attachments: Vec<Attachment> =
            serde_json::from_value(model.attachments).unwrap_or_default();
        Self {
            id: model.id,
            thread_id: model.thread_id,
            sender_id: model.sender_id,
            sender_role: model.sender_role,
            body: model.body,
            attachments,
            created_at: model.created_at.into(),
        }
    }
}

impl From<&Message> for ActiveModel {
    fn from(message: &Message) -> Self {
        ActiveModel {
            id: Set(message.id),
            thread_id: Set(message.thread_id),
            sender_id: Set(message.sender_id),
            sender_role: Set(message.sender_role),
            body: Set(message.body.clone()),
            attachments: Set(serde_json::to_value(&message.attachments).unwrap_or_default()),
            created_at: Set(message.created_at.into()),
        }
    }
}
