use async_trait::async_trait;
use chrono::Utc;
use database::BaseRepository;
use database::text::contains_pattern;
use sea_orm::sea_query::{Alias, Expr, ExprTrait};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::{contact_message, customer};
use crate::error::{CustomerError, CustomerResult};
use crate::models::{ContactFilter, ContactMessage, ContactStatus, Customer, CustomerFilter};
use crate::repository::{ContactRepository, CustomerRepository};

fn limit_of(limit: usize) -> u64 {
    u64::try_from(limit).unwrap_or(u64::MAX)
}

pub struct PgCustomerRepository {
    base: BaseRepository<customer::Entity>,
}

impl PgCustomerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> CustomerResult<bool> {
        let mut query = customer::Entity::find().filter(customer::Column::Email.eq(email));
        if let Some(id) = exclude {
            query = query.filter(customer::Column::Id.ne(id));
        }
        Ok(query.count(self.base.db()).await? > 0)
    }
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn create(&self, customer: Customer) -> CustomerResult<Customer> {
        if self.email_taken(&customer.email, None).await? {
            return Err(CustomerError::DuplicateEmail(customer.email));
        }
        let model = self.base.insert(customer::ActiveModel::from(&customer)).await?;
        tracing::info!(customer_id = %model.id, "Created customer");
        Ok(model.into())
    }

    async fn get(&self, id: Uuid) -> CustomerResult<Option<Customer>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> CustomerResult<Option<Customer>> {
        Ok(customer::Entity::find()
            .filter(customer::Column::Email.eq(email))
            .one(self.base.db())
            .await?
            .map(Into::into))
    }

    async fn list(&self, filter: CustomerFilter) -> CustomerResult<Vec<Customer>> {
        let mut query = customer::Entity::find();

        if let Some(ref search) = filter.search {
            let pattern = contains_pattern(search.trim());
            query = query.filter(
                Condition::any()
                    .add(Expr::cust_with_values("email ILIKE ?", [pattern.clone()]))
                    .add(Expr::cust_with_values("first_name ILIKE ?", [pattern.clone()]))
                    .add(Expr::cust_with_values("last_name ILIKE ?", [pattern])),
            );
        }
        if let Some(ref tag) = filter.tag {
            query = query.filter(Expr::cust_with_values(
                "? = ANY(tags)",
                [tag.trim().to_lowercase()],
            ));
        }
        if let Some(accepts) = filter.accepts_marketing {
            query = query.filter(customer::Column::AcceptsMarketing.eq(accepts));
        }

        let models = query
            .order_by_desc(customer::Column::CreatedAt)
            .order_by_desc(customer::Column::Id)
            .limit(limit_of(filter.limit))
            .offset(filter.offset as u64)
            .all(self.base.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, customer: Customer) -> CustomerResult<Customer> {
        if self.base.find_by_id(customer.id).await?.is_none() {
            return Err(CustomerError::NotFound(customer.id));
        }
        if self.email_taken(&customer.email, Some(customer.id)).await? {
            return Err(CustomerError::DuplicateEmail(customer.email));
        }
        let model = self.base.update(customer::ActiveModel::from(&customer)).await?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> CustomerResult<bool> {
        Ok(self.base.delete_by_id(id).await? > 0)
    }
}

pub struct PgContactRepository {
    base: BaseRepository<contact_message::Entity>,
}

impl PgContactRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn create(&self, message: ContactMessage) -> CustomerResult<ContactMessage> {
        let model = self
            .base
            .insert(contact_message::ActiveModel::from(&message))
            .await?;
        Ok(model.into())
    }

    async fn get(&self, id: Uuid) -> CustomerResult<Option<ContactMessage>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn list(&self, filter: ContactFilter) -> CustomerResult<Vec<ContactMessage>> {
        let mut query = contact_message::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(contact_message::Column::Status.eq(status));
        }
        if let Some(ref search) = filter.search {
            let pattern = contains_pattern(search.trim());
            let mut any = Condition::any();
            for column in ["name", "email", "subject", "body"] {
                any = any.add(Expr::cust_with_values(
                    format!("{column} ILIKE ?"),
                    [pattern.clone()],
                ));
            }
            query = query.filter(any);
        }

        let models = query
            .order_by_desc(contact_message::Column::CreatedAt)
            .order_by_desc(contact_message::Column::Id)
            .limit(limit_of(filter.limit))
            .offset(filter.offset as u64)
            .all(self.base.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> CustomerResult<Option<ContactMessage>> {
        let result = contact_message::Entity::update_many()
            .col_expr(
                contact_message::Column::Status,
                Expr::val(status.to_string()).cast_as(Alias::new("contact_status")),
            )
            .col_expr(contact_message::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(contact_message::Column::Id.eq(id))
            .exec(self.base.db())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: Uuid) -> CustomerResult<bool> {
        Ok(self.base.delete_by_id(id).await? > 0)
    }

    async fn count_with_status(&self, status: ContactStatus) -> CustomerResult<u64> {
        Ok(contact_message::Entity::find()
            .filter(contact_message::Column::Status.eq(status))
            .count(self.base.db())
            .await?)
    }
}
