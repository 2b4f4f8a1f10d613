use async_trait::async_trait;
use chrono::Utc;
use database::BaseRepository;
use sea_orm::sea_query::{Alias, Expr, ExprTrait};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::{ActiveModel, Column, Entity};
use crate::error::{OrderError, OrderResult};
use crate::models::{Order, OrderFilter, OrderStatus};
use crate::repository::OrderRepository;

/// Orders over the `orders` table; numbers come from `order_number_seq`
pub struct PgOrderRepository {
    base: BaseRepository<Entity>,
}

impl PgOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: Order) -> OrderResult<Order> {
        let model = self.base.insert(ActiveModel::from(&order)).await?;
        tracing::info!(order_id = %model.id, number = %model.number, "Created order");
        Ok(model.into())
    }

    async fn get(&self, id: Uuid) -> OrderResult<Option<Order>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn list(&self, filter: OrderFilter) -> OrderResult<Vec<Order>> {
        let mut query = Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(Column::CustomerId.eq(customer_id));
        }
        if let Some(ref email) = filter.customer_email {
            // stored lowercased
            query = query.filter(Column::CustomerEmail.eq(email.trim().to_lowercase()));
        }
        if let Some(from) = filter.placed_from {
            query = query.filter(Column::PlacedAt.gte(from));
        }
        if let Some(to) = filter.placed_to {
            query = query.filter(Column::PlacedAt.lt(to));
        }

        let models = query
            .order_by_desc(Column::PlacedAt)
            .order_by_desc(Column::Id)
            .limit(u64::try_from(filter.limit).unwrap_or(u64::MAX))
            .offset(filter.offset as u64)
            .all(self.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, order: Order) -> OrderResult<Order> {
        if self.base.find_by_id(order.id).await?.is_none() {
            return Err(OrderError::NotFound(order.id));
        }
        let model = self.base.update(ActiveModel::from(&order)).await?;
        Ok(model.into())
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> OrderResult<Option<Order>> {
        let result = Entity::update_many()
            .col_expr(
                Column::Status,
                Expr::val(to.to_string()).cast_as(Alias::new("order_status")),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(from))
            .exec(self.db())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn delete(&self, id: Uuid) -> OrderResult<bool> {
        Ok(self.base.delete_by_id(id).await? > 0)
    }
}
