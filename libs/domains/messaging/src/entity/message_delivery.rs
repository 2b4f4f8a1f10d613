use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

use crate::models::{Delivery, DeliveryStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "message_deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub message_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub recipient_id: Uuid,
    pub status: DeliveryStatus,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub read_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Delivery {
    fn from(model: Model) -> Self {
        Self {
            message_id: model.message_id,
            recipient_id: model.recipient_id,
            status: model.status,
            delivered_at: model.delivered_at.map(Into::into),
            read_at: model.read_at.map(Into::into),
        }
    }
}

impl From<&Delivery> for ActiveModel {
    fn from(delivery: &Delivery) -> Self {
        ActiveModel {
            message_id: Set(delivery.message_id),
            recipient_id: Set(delivery.recipient_id),
            status: Set(delivery.status),
            delivered_at: Set(delivery.delivered_at.map(Into::into)),
            read_at: Set(delivery.read_at.map(Into::into)),
        }
    }
}
