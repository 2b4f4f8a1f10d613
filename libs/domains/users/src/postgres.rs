use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::BaseRepository;
use sea_orm::sea_query::{Expr, ExprTrait, Func};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{UserError, UserResult},
    models::{User, UserFilter},
    repository::UserRepository,
};

pub struct PgUserRepository {
    base: BaseRepository<entity::Entity>,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        if self.get_by_email(&user.email).await?.is_some() {
            return Err(UserError::DuplicateEmail(user.email));
        }

        let model = self.base.insert(entity::ActiveModel::from(&user)).await?;

        tracing::info!(user_id = %model.id, "Created user");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Email.eq(email))
            .one(self.base.db())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let mut query = entity::Entity::find();

        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(entity::Column::Email.like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(entity::Column::Name))).like(pattern)),
            );
        }

        if let Some(role) = filter.role {
            // roles is TEXT[]
            query = query.filter(Expr::cust_with_values("? = ANY(roles)", [role.to_string()]));
        }

        if let Some(is_active) = filter.is_active {
            query = query.filter(entity::Column::IsActive.eq(is_active));
        }

        let models = query
            .order_by_asc(entity::Column::Email)
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(self.base.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let model = self.base.update(entity::ActiveModel::from(&user)).await?;
        tracing::info!(user_id = %user.id, "Updated user");
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let rows = self.base.delete_by_id(id).await?;
        if rows > 0 {
            tracing::info!(user_id = %id, "Deleted user");
        }
        Ok(rows > 0)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> UserResult<()> {
        entity::Entity::update_many()
            .col_expr(entity::Column::LastLoginAt, Expr::value(at))
            .filter(entity::Column::Id.eq(id))
            .exec(self.base.db())
            .await?;
        Ok(())
    }
}
