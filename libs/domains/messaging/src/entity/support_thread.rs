use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Thread, ThreadStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "support_threads")]
#[sea_orm_resource(url = "/threads", tag = "Messaging")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subject: String,
    pub customer_id: Option<Uuid>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub status: ThreadStatus,
    pub assigned_to: Option<Uuid>,
    pub last_message_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Thread {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            subject: model.subject,
            customer_id: model.customer_id,
            customer_email: model.customer_email,
            customer_name: model.customer_name,
            status: model.status,
            assigned_to: model.assigned_to,
            last_message_at: model.last_message_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&Thread> for ActiveModel {
    fn from(thread: &Thread) -> Self {
        ActiveModel {
            id: Set(thread.id),
            subject: Set(thread.subject.clone()),
            customer_id: Set(thread.customer_id),
            customer_email: Set(thread.customer_email.clone()),
            customer_name: Set(thread.customer_name.clone()),
            status: Set(thread.status),
            assigned_to: Set(thread.assigned_to),
            last_message_at: Set(thread.last_message_at.map(Into::into)),
            created_at: Set(thread.created_at.into()),
            updated_at: Set(thread.updated_at.into()),
        }
    }
}
