use core_proc_macros::SeaOrmResource;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Address, Order, OrderItem, OrderStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub number: String,
    pub customer_id: Option<Uuid>,
    pub customer_email: String,
    pub status: OrderStatus,
    #[sea_orm(column_type = "JsonBinary")]
    pub items: Json,
    pub subtotal_cents: i64,
    pub discount_code: Option<String>,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub shipping_address: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub placed_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Order {
    fn from(model: Model) -> Self {
        let items: Vec<OrderItem> = serde_json::from_value(model.items).unwrap_or_default();
        let shipping_address: Option<Address> = model
            .shipping_address
            .and_then(|value| serde_json::from_value(value).ok());

        Self {
            id: model.id,
            number: model.number,
            customer_id: model.customer_id,
            customer_email: model.customer_email,
            status: model.status,
            items,
            subtotal_cents: model.subtotal_cents,
            discount_code: model.discount_code,
            discount_cents: model.discount_cents,
            shipping_cents: model.shipping_cents,
            tax_cents: model.tax_cents,
            total_cents: model.total_cents,
            currency: model.currency,
            shipping_address,
            note: model.note,
            placed_at: model.placed_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&Order> for ActiveModel {
    /// An empty `number` is left to the column default (`order_number_seq`)
    fn from(order: &Order) -> Self {
        ActiveModel {
            id: Set(order.id),
            number: if order.number.is_empty() {
                NotSet
            } else {
                Set(order.number.clone())
            },
            customer_id: Set(order.customer_id),
            customer_email: Set(order.customer_email.clone()),
            status: Set(order.status),
            items: Set(serde_json::to_value(&order.items).unwrap_or_default()),
            subtotal_cents: Set(order.subtotal_cents),
            discount_code: Set(order.discount_code.clone()),
            discount_cents: Set(order.discount_cents),
            shipping_cents: Set(order.shipping_cents),
            tax_cents: Set(order.tax_cents),
            total_cents: Set(order.total_cents),
            currency: Set(order.currency.clone()),
            shipping_address: Set(order
                .shipping_address
                .as_ref()
                .and_then(|a| serde_json::to_value(a).ok())),
            note: Set(order.note.clone()),
            placed_at: Set(order.placed_at.into()),
            updated_at: Set(order.updated_at.into()),
        }
    }
}
