use async_trait::async_trait;
use database::BaseRepository;
use database::text::contains_pattern;
use sea_orm::sea_query::{Expr, ExprTrait, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    entity::{category, collection, collection_product, product},
    error::{CatalogError, CatalogResult},
    models::{
        Category, CategoryFilter, Collection, CollectionFilter, Product, ProductFilter,
        ProductStatus,
    },
    repository::{
        CategoryRepository, CollectionRepository, ProductRepository, SEARCH_CANDIDATE_LIMIT,
    },
};

/// Catalog storage over the `products`, `categories`, `collections` and
/// `collection_products` tables
pub struct PgCatalogRepository {
    products: BaseRepository<product::Entity>,
    categories: BaseRepository<category::Entity>,
    collections: BaseRepository<collection::Entity>,
}

impl PgCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            products: BaseRepository::new(db.clone()),
            categories: BaseRepository::new(db.clone()),
            collections: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.products.db()
    }

    async fn sku_taken(&self, sku: &str, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }

    async fn member_counts(&self, ids: &[Uuid]) -> CatalogResult<HashMap<Uuid, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, i64)> = collection_product::Entity::find()
            .select_only()
            .column(collection_product::Column::CollectionId)
            .column_as(collection_product::Column::ProductId.count(), "product_count")
            .filter(collection_product::Column::CollectionId.is_in(ids.to_vec()))
            .group_by(collection_product::Column::CollectionId)
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(rows.into_iter().collect())
    }

    async fn with_counts(&self, models: Vec<collection::Model>) -> CatalogResult<Vec<Collection>> {
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let counts = self.member_counts(&ids).await?;
        Ok(models
            .into_iter()
            .map(|m| {
                let count = counts.get(&m.id).copied().unwrap_or(0);
                m.into_collection(count)
            })
            .collect())
    }
}

/// `%token%` patterns for `ILIKE ANY(...)`
fn patterns(tokens: &[String]) -> Vec<String> {
    tokens.iter().map(|t| contains_pattern(t)).collect()
}

fn member_of(collection_id: Uuid) -> Condition {
    Condition::all().add(Expr::cust_with_values(
        "id IN (SELECT product_id FROM collection_products WHERE collection_id = ?)",
        [collection_id],
    ))
}

#[async_trait]
impl ProductRepository for PgCatalogRepository {
    async fn create_product(&self, product: Product) -> CatalogResult<Product> {
        if self.sku_taken(&product.sku, None).await? {
            return Err(CatalogError::DuplicateSku(product.sku));
        }

        let model = self.products.insert(product::ActiveModel::from(&product)).await?;

        tracing::info!(product_id = %model.id, sku = %model.sku, "Created product");
        Ok(model.into())
    }

    async fn get_product(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        Ok(self.products.find_by_id(id).await?.map(Into::into))
    }

    async fn get_product_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>> {
        let model = product::Entity::find()
            .filter(product::Column::Slug.eq(slug))
            .one(self.db())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn get_product_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>> {
        let model = product::Entity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(self.db())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list_products(&self, filter: ProductFilter) -> CatalogResult<Vec<Product>> {
        let mut query = product::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(product::Column::Status.eq(status));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(collection_id) = filter.collection_id {
            query = query.filter(member_of(collection_id));
        }
        if let Some(ref tag) = filter.tag {
            // tags is TEXT[], stored lowercased
            query = query.filter(Expr::cust_with_values(
                "? = ANY(tags)",
                [tag.trim().to_lowercase()],
            ));
        }
        if let Some(min) = filter.min_price {
            query = query.filter(product::Column::PriceCents.gte(min));
        }
        if let Some(max) = filter.max_price {
            query = query.filter(product::Column::PriceCents.lte(max));
        }
        match filter.in_stock {
            Some(true) => query = query.filter(product::Column::Stock.gt(0)),
            Some(false) => query = query.filter(product::Column::Stock.eq(0)),
            None => {}
        }
        if let Some(ref search) = filter.search {
            let pattern = contains_pattern(search.trim());
            query = query.filter(
                Condition::any()
                    .add(Expr::cust_with_values("title ILIKE ?", [pattern.clone()]))
                    .add(Expr::cust_with_values("sku ILIKE ?", [pattern])),
            );
        }

        let models = query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .limit(u64::try_from(filter.limit).unwrap_or(u64::MAX))
            .offset(filter.offset as u64)
            .all(self.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_product(&self, product: Product) -> CatalogResult<Product> {
        if self.sku_taken(&product.sku, Some(product.id)).await? {
            return Err(CatalogError::DuplicateSku(product.sku));
        }

        let model = self.products.update(product::ActiveModel::from(&product)).await?;
        tracing::info!(product_id = %product.id, "Updated product");
        Ok(model.into())
    }

    async fn delete_product(&self, id: Uuid) -> CatalogResult<bool> {
        let rows = self.products.delete_by_id(id).await?;
        if rows > 0 {
            tracing::info!(product_id = %id, "Deleted product");
        }
        Ok(rows > 0)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> CatalogResult<Product> {
        // Single guarded UPDATE so concurrent adjustments cannot oversell
        let result = product::Entity::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(delta),
            )
            .filter(product::Column::Id.eq(id))
            .filter(Expr::col(product::Column::Stock).add(delta).gte(0))
            .exec(self.db())
            .await?;

        let current = self
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        if result.rows_affected == 0 {
            return Err(CatalogError::InsufficientStock {
                product_id: id,
                resulting: i64::from(current.stock) + i64::from(delta),
            });
        }

        Ok(current)
    }

    async fn low_stock(&self, threshold: i32, limit: u64) -> CatalogResult<Vec<Product>> {
        let models = product::Entity::find()
            .filter(product::Column::Status.ne(ProductStatus::Archived))
            .filter(product::Column::Stock.lte(threshold))
            .order_by_asc(product::Column::Stock)
            .order_by_asc(product::Column::Title)
            .limit(limit)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn product_slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let mut query = product::Entity::find().filter(product::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }

    async fn existing_product_ids(&self, ids: Vec<Uuid>) -> CatalogResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<Uuid> = product::Entity::find()
            .select_only()
            .column(product::Column::Id)
            .filter(product::Column::Id.is_in(ids))
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(found)
    }

    async fn search_products(&self, tokens: Vec<String>) -> CatalogResult<Vec<Product>> {
        let patterns = patterns(&tokens);
        let models = product::Entity::find()
            .filter(Expr::cust_with_values(
                "(title ILIKE ANY(?) OR sku ILIKE ANY(?) OR description ILIKE ANY(?) \
                 OR array_to_string(tags, ' ') ILIKE ANY(?))",
                [
                    patterns.clone(),
                    patterns.clone(),
                    patterns.clone(),
                    patterns,
                ],
            ))
            .limit(SEARCH_CANDIDATE_LIMIT)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CategoryRepository for PgCatalogRepository {
    async fn create_category(&self, category: Category) -> CatalogResult<Category> {
        let model = self
            .categories
            .insert(category::ActiveModel::from(&category))
            .await?;
        tracing::info!(category_id = %model.id, "Created category");
        Ok(model.into())
    }

    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        Ok(self.categories.find_by_id(id).await?.map(Into::into))
    }

    async fn get_category_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>> {
        let model = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(self.db())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list_categories(&self, filter: CategoryFilter) -> CatalogResult<Vec<Category>> {
        let mut query = category::Entity::find();
        if let Some(parent_id) = filter.parent_id {
            query = query.filter(category::Column::ParentId.eq(parent_id));
        }
        if filter.root_only {
            query = query.filter(category::Column::ParentId.is_null());
        }
        let models = query
            .order_by_asc(category::Column::Position)
            .order_by_asc(category::Column::Name)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_category(&self, category: Category) -> CatalogResult<Category> {
        let model = self
            .categories
            .update(category::ActiveModel::from(&category))
            .await?;
        tracing::info!(category_id = %category.id, "Updated category");
        Ok(model.into())
    }

    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool> {
        // products.category_id is ON DELETE SET NULL
        let rows = self.categories.delete_by_id(id).await?;
        if rows > 0 {
            tracing::info!(category_id = %id, "Deleted category");
        }
        Ok(rows > 0)
    }

    async fn has_children(&self, id: Uuid) -> CatalogResult<bool> {
        let count = category::Entity::find()
            .filter(category::Column::ParentId.eq(id))
            .count(self.db())
            .await?;
        Ok(count > 0)
    }

    async fn category_slug_exists(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let mut query = category::Entity::find().filter(category::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(category::Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }

    async fn search_categories(&self, tokens: Vec<String>) -> CatalogResult<Vec<Category>> {
        let patterns = patterns(&tokens);
        let models = category::Entity::find()
            .filter(Expr::cust_with_values(
                "(name ILIKE ANY(?) OR description ILIKE ANY(?))",
                [patterns.clone(), patterns],
            ))
            .limit(SEARCH_CANDIDATE_LIMIT)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CollectionRepository for PgCatalogRepository {
    async fn create_collection(&self, collection: Collection) -> CatalogResult<Collection> {
        let model = self
            .collections
            .insert(collection::ActiveModel::from(&collection))
            .await?;
        tracing::info!(collection_id = %model.id, "Created collection");
        Ok(model.into_collection(0))
    }

    async fn get_collection(&self, id: Uuid) -> CatalogResult<Option<Collection>> {
        let Some(model) = self.collections.find_by_id(id).await? else {
            return Ok(None);
        };
        Ok(self.with_counts(vec![model]).await?.pop())
    }

    async fn list_collections(&self, filter: CollectionFilter) -> CatalogResult<Vec<Collection>> {
        let mut query = collection::Entity::find();
        if let Some(is_published) = filter.is_published {
            query = query.filter(collection::Column::IsPublished.eq(is_published));
        }
        if let Some(ref search) = filter.search {
            query = query.filter(Expr::cust_with_values(
                "title ILIKE ?",
                [contains_pattern(search.trim())],
            ));
        }
        let models = query
            .order_by_asc(collection::Column::Title)
            .limit(u64::try_from(filter.limit).unwrap_or(u64::MAX))
            .offset(filter.offset as u64)
            .all(self.db())
            .await?;
        self.with_counts(models).await
    }

    async fn update_collection(&self, collection: Collection) -> CatalogResult<Collection> {
        let model = self
            .collections
            .update(collection::ActiveModel::from(&collection))
            .await?;
        tracing::info!(collection_id = %collection.id, "Updated collection");
        Ok(self.with_counts(vec![model]).await?.remove(0))
    }

    async fn delete_collection(&self, id: Uuid) -> CatalogResult<bool> {
        let rows = self.collections.delete_by_id(id).await?;
        if rows > 0 {
            tracing::info!(collection_id = %id, "Deleted collection");
        }
        Ok(rows > 0)
    }

    async fn add_products(
        &self,
        collection_id: Uuid,
        product_ids: Vec<Uuid>,
    ) -> CatalogResult<usize> {
        let existing: HashSet<Uuid> = collection_product::Entity::find()
            .select_only()
            .column(collection_product::Column::ProductId)
            .filter(collection_product::Column::CollectionId.eq(collection_id))
            .filter(collection_product::Column::ProductId.is_in(product_ids.clone()))
            .into_tuple::<Uuid>()
            .all(self.db())
            .await?
            .into_iter()
            .collect();

        let mut seen = existing;
        let now = chrono::Utc::now();
        let rows: Vec<collection_product::ActiveModel> = product_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .map(|product_id| collection_product::ActiveModel {
                collection_id: Set(collection_id),
                product_id: Set(product_id),
                added_at: Set(now.into()),
            })
            .collect();

        if rows.is_empty() {
            return Ok(0);
        }

        let inserted = collection_product::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    collection_product::Column::CollectionId,
                    collection_product::Column::ProductId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db())
            .await?;

        tracing::info!(collection_id = %collection_id, added = inserted, "Added products to collection");
        Ok(inserted as usize)
    }

    async fn remove_product(&self, collection_id: Uuid, product_id: Uuid) -> CatalogResult<bool> {
        let result = collection_product::Entity::delete_many()
            .filter(collection_product::Column::CollectionId.eq(collection_id))
            .filter(collection_product::Column::ProductId.eq(product_id))
            .exec(self.db())
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn list_collection_products(&self, collection_id: Uuid) -> CatalogResult<Vec<Product>> {
        let models = product::Entity::find()
            .filter(member_of(collection_id))
            .order_by_asc(product::Column::Title)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn collection_slug_exists(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let mut query = collection::Entity::find().filter(collection::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(collection::Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }

    async fn search_collections(&self, tokens: Vec<String>) -> CatalogResult<Vec<Collection>> {
        let patterns = patterns(&tokens);
        let models = collection::Entity::find()
            .filter(Expr::cust_with_values(
                "(title ILIKE ANY(?) OR description ILIKE ANY(?))",
                [patterns.clone(), patterns],
            ))
            .limit(SEARCH_CANDIDATE_LIMIT)
            .all(self.db())
            .await?;
        self.with_counts(models).await
    }
}
