use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PrimaryKeyTrait,
};
use std::marker::PhantomData;
use uuid::Uuid;

/// Entities keyed by a single UUID column
pub trait UuidEntity: EntityTrait {}

impl<E> UuidEntity for E
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
}

/// CRUD helpers shared by the Postgres repositories.
///
/// Domain repositories wrap one of these and add their own filtered
/// queries through [`BaseRepository::db`].
#[derive(Clone)]
pub struct BaseRepository<E: UuidEntity> {
    db: DatabaseConnection,
    _entity: PhantomData<E>,
}

impl<E> BaseRepository<E>
where
    E: UuidEntity,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
    E::Model: IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
{
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn insert(&self, model: E::ActiveModel) -> Result<E::Model, DbErr> {
        model.insert(&self.db).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<E::Model>, DbErr> {
        E::find_by_id(id).one(&self.db).await
    }

    pub async fn update(&self, model: E::ActiveModel) -> Result<E::Model, DbErr> {
        model.update(&self.db).await
    }

    /// Number of deleted rows (0 or 1)
    pub async fn delete_by_id(&self, id: Uuid) -> Result<u64, DbErr> {
        let result = E::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}
