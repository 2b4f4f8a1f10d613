use async_trait::async_trait;
use chrono::Utc;
use database::BaseRepository;
use database::text::contains_pattern;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::{ActiveModel, Column, Entity};
use crate::error::{DiscountError, DiscountResult};
use crate::models::{Discount, DiscountFilter};
use crate::repository::DiscountRepository;

pub struct PgDiscountRepository {
    base: BaseRepository<Entity>,
}

impl PgDiscountRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }

    async fn code_taken(&self, code: &str, exclude: Option<Uuid>) -> DiscountResult<bool> {
        let mut query = Entity::find().filter(Column::Code.eq(code));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }
}

#[async_trait]
impl DiscountRepository for PgDiscountRepository {
    async fn create(&self, discount: Discount) -> DiscountResult<Discount> {
        if self.code_taken(&discount.code, None).await? {
            return Err(DiscountError::DuplicateCode(discount.code));
        }
        let model = self.base.insert(ActiveModel::from(&discount)).await?;
        tracing::info!(discount_id = %model.id, code = %model.code, "Created discount");
        Ok(model.into())
    }

    async fn get(&self, id: Uuid) -> DiscountResult<Option<Discount>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn get_by_code(&self, code: &str) -> DiscountResult<Option<Discount>> {
        Ok(Entity::find()
            .filter(Column::Code.eq(code))
            .one(self.db())
            .await?
            .map(Into::into))
    }

    async fn list(&self, filter: DiscountFilter) -> DiscountResult<Vec<Discount>> {
        let mut query = Entity::find();

        if let Some(active) = filter.active {
            query = query.filter(Column::IsActive.eq(active));
        }
        if let Some(ref search) = filter.search {
            let pattern = contains_pattern(search.trim());
            query = query.filter(
                Condition::any()
                    .add(Expr::cust_with_values("code ILIKE ?", [pattern.clone()]))
                    .add(Expr::cust_with_values("description ILIKE ?", [pattern])),
            );
        }

        let models = query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(u64::try_from(filter.limit).unwrap_or(u64::MAX))
            .offset(filter.offset as u64)
            .all(self.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, discount: Discount) -> DiscountResult<Discount> {
        if self.base.find_by_id(discount.id).await?.is_none() {
            return Err(DiscountError::NotFound(discount.id));
        }
        if self.code_taken(&discount.code, Some(discount.id)).await? {
            return Err(DiscountError::DuplicateCode(discount.code));
        }
        let model = self.base.update(ActiveModel::from(&discount)).await?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> DiscountResult<bool> {
        Ok(self.base.delete_by_id(id).await? > 0)
    }

    async fn increment_usage(&self, id: Uuid) -> DiscountResult<Option<Discount>> {
        // One guarded UPDATE so concurrent redemptions cannot exceed the limit
        let result = Entity::update_many()
            .col_expr(Column::UsageCount, Expr::col(Column::UsageCount).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(
                Condition::any()
                    .add(Column::UsageLimit.is_null())
                    .add(Expr::col(Column::UsageCount).lt(Expr::col(Column::UsageLimit))),
            )
            .exec(self.db())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }
}
