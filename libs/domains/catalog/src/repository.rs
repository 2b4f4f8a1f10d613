use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CategoryFilter, Collection, CollectionFilter, Product, ProductFilter, ProductStatus,
};

/// Upper bound of candidates fetched per kind for a search
pub const SEARCH_CANDIDATE_LIMIT: u64 = 200;

/// Product listings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a product; SKU and slug must be free
    async fn create_product(&self, product: Product) -> CatalogResult<Product>;

    async fn get_product(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    async fn get_product_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>>;

    async fn get_product_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>>;

    /// Newest first
    async fn list_products(&self, filter: ProductFilter) -> CatalogResult<Vec<Product>>;

    async fn update_product(&self, product: Product) -> CatalogResult<Product>;

    async fn delete_product(&self, id: Uuid) -> CatalogResult<bool>;

    /// Add `delta` to the stock in one step; never lets stock go negative
    async fn adjust_stock(&self, id: Uuid, delta: i32) -> CatalogResult<Product>;

    /// Non-archived products with `stock <= threshold`, lowest stock first
    async fn low_stock(&self, threshold: i32, limit: u64) -> CatalogResult<Vec<Product>>;

    async fn product_slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> CatalogResult<bool>;

    /// The subset of `ids` that exist
    async fn existing_product_ids(&self, ids: Vec<Uuid>) -> CatalogResult<Vec<Uuid>>;

    /// Products whose title, SKU, tags or description contain any token
    async fn search_products(&self, tokens: Vec<String>) -> CatalogResult<Vec<Product>>;
}

/// Category tree
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create_category(&self, category: Category) -> CatalogResult<Category>;

    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>>;

    async fn get_category_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>>;

    /// Ordered by position, then name
    async fn list_categories(&self, filter: CategoryFilter) -> CatalogResult<Vec<Category>>;

    async fn update_category(&self, category: Category) -> CatalogResult<Category>;

    /// Products of the category are detached, not deleted
    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool>;

    async fn has_children(&self, id: Uuid) -> CatalogResult<bool>;

    async fn category_slug_exists(&self, slug: &str, exclude: Option<Uuid>)
    -> CatalogResult<bool>;

    async fn search_categories(&self, tokens: Vec<String>) -> CatalogResult<Vec<Category>>;
}

/// Curated product collections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn create_collection(&self, collection: Collection) -> CatalogResult<Collection>;

    async fn get_collection(&self, id: Uuid) -> CatalogResult<Option<Collection>>;

    /// Ordered by title
    async fn list_collections(&self, filter: CollectionFilter) -> CatalogResult<Vec<Collection>>;

    async fn update_collection(&self, collection: Collection) -> CatalogResult<Collection>;

    async fn delete_collection(&self, id: Uuid) -> CatalogResult<bool>;

    /// Number of memberships actually created; existing ones are skipped
    async fn add_products(&self, collection_id: Uuid, product_ids: Vec<Uuid>)
    -> CatalogResult<usize>;

    async fn remove_product(&self, collection_id: Uuid, product_id: Uuid) -> CatalogResult<bool>;

    /// Ordered by title
    async fn list_collection_products(&self, collection_id: Uuid) -> CatalogResult<Vec<Product>>;

    async fn collection_slug_exists(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool>;

    async fn search_collections(&self, tokens: Vec<String>) -> CatalogResult<Vec<Collection>>;
}

/// Everything the catalog service needs
pub trait CatalogRepository: ProductRepository + CategoryRepository + CollectionRepository {}

impl<T> CatalogRepository for T where T: ProductRepository + CategoryRepository + CollectionRepository
{}

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<Uuid, Product>,
    categories: HashMap<Uuid, Category>,
    collections: HashMap<Uuid, Collection>,
    /// collection id -> member product ids, in insertion order
    memberships: HashMap<Uuid, Vec<Uuid>>,
}

impl CatalogState {
    fn with_count(&self, mut collection: Collection) -> Collection {
        collection.product_count = self
            .memberships
            .get(&collection.id)
            .map_or(0, |m| m.len() as i64);
        collection
    }

    fn in_collection(&self, collection_id: Uuid, product_id: Uuid) -> bool {
        self.memberships
            .get(&collection_id)
            .is_some_and(|m| m.contains(&product_id))
    }
}

/// In-memory implementation (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_any(haystack: &str, tokens: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    tokens.iter().any(|t| haystack.contains(t.as_str()))
}

#[async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn create_product(&self, product: Product) -> CatalogResult<Product> {
        let mut state = self.state.write().await;

        if state.products.values().any(|p| p.sku == product.sku) {
            return Err(CatalogError::DuplicateSku(product.sku));
        }

        state.products.insert(product.id, product.clone());
        tracing::info!(product_id = %product.id, sku = %product.sku, "Created product");
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn get_product_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().find(|p| p.sku == sku).cloned())
    }

    async fn list_products(&self, filter: ProductFilter) -> CatalogResult<Vec<Product>> {
        let state = self.state.read().await;

        let mut result: Vec<Product> = state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .filter(|p| {
                filter
                    .collection_id
                    .is_none_or(|c| state.in_collection(c, p.id))
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update_product(&self, product: Product) -> CatalogResult<Product> {
        let mut state = self.state.write().await;

        if !state.products.contains_key(&product.id) {
            return Err(CatalogError::ProductNotFound(product.id));
        }
        if state
            .products
            .values()
            .any(|p| p.sku == product.sku && p.id != product.id)
        {
            return Err(CatalogError::DuplicateSku(product.sku));
        }

        state.products.insert(product.id, product.clone());
        tracing::info!(product_id = %product.id, "Updated product");
        Ok(product)
    }

    async fn delete_product(&self, id: Uuid) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.products.remove(&id).is_some();
        if removed {
            for members in state.memberships.values_mut() {
                members.retain(|p| *p != id);
            }
            tracing::info!(product_id = %id, "Deleted product");
        }
        Ok(removed)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> CatalogResult<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(CatalogError::ProductNotFound(id))?;

        let resulting = i64::from(product.stock) + i64::from(delta);
        if resulting < 0 {
            return Err(CatalogError::InsufficientStock {
                product_id: id,
                resulting,
            });
        }

        product.stock = i32::try_from(resulting)
            .map_err(|_| CatalogError::Validation("stock out of range".to_string()))?;
        product.updated_at = chrono::Utc::now();
        Ok(product.clone())
    }

    async fn low_stock(&self, threshold: i32, limit: u64) -> CatalogResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut result: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.status != ProductStatus::Archived && p.stock <= threshold)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.title.cmp(&b.title)));
        result.truncate(limit as usize);
        Ok(result)
    }

    async fn product_slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }

    async fn existing_product_ids(&self, ids: Vec<Uuid>) -> CatalogResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(ids
            .into_iter()
            .filter(|id| state.products.contains_key(id))
            .collect())
    }

    async fn search_products(&self, tokens: Vec<String>) -> CatalogResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|p| {
                contains_any(&p.title, &tokens)
                    || contains_any(&p.sku, &tokens)
                    || contains_any(&p.description, &tokens)
                    || p.tags.iter().any(|t| contains_any(t, &tokens))
            })
            .take(SEARCH_CANDIDATE_LIMIT as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCatalog {
    async fn create_category(&self, category: Category) -> CatalogResult<Category> {
        let mut state = self.state.write().await;
        state.categories.insert(category.id, category.clone());
        tracing::info!(category_id = %category.id, "Created category");
        Ok(category)
    }

    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn list_categories(&self, filter: CategoryFilter) -> CatalogResult<Vec<Category>> {
        let state = self.state.read().await;
        let mut result: Vec<Category> = state
            .categories
            .values()
            .filter(|c| filter.parent_id.is_none_or(|p| c.parent_id == Some(p)))
            .filter(|c| !filter.root_only || c.parent_id.is_none())
            .cloned()
            .collect();
        result.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(result)
    }

    async fn update_category(&self, category: Category) -> CatalogResult<Category> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&category.id) {
            return Err(CatalogError::CategoryNotFound(category.id));
        }
        state.categories.insert(category.id, category.clone());
        tracing::info!(category_id = %category.id, "Updated category");
        Ok(category)
    }

    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.categories.remove(&id).is_some();
        if removed {
            for product in state.products.values_mut() {
                if product.category_id == Some(id) {
                    product.category_id = None;
                }
            }
            tracing::info!(category_id = %id, "Deleted category");
        }
        Ok(removed)
    }

    async fn has_children(&self, id: Uuid) -> CatalogResult<bool> {
        let state = self.state.read().await;
        Ok(state.categories.values().any(|c| c.parent_id == Some(id)))
    }

    async fn category_slug_exists(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .any(|c| c.slug == slug && Some(c.id) != exclude))
    }

    async fn search_categories(&self, tokens: Vec<String>) -> CatalogResult<Vec<Category>> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .filter(|c| contains_any(&c.name, &tokens) || contains_any(&c.description, &tokens))
            .take(SEARCH_CANDIDATE_LIMIT as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CollectionRepository for InMemoryCatalog {
    async fn create_collection(&self, collection: Collection) -> CatalogResult<Collection> {
        let mut state = self.state.write().await;
        state.collections.insert(collection.id, collection.clone());
        tracing::info!(collection_id = %collection.id, "Created collection");
        Ok(state.with_count(collection))
    }

    async fn get_collection(&self, id: Uuid) -> CatalogResult<Option<Collection>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(&id)
            .cloned()
            .map(|c| state.with_count(c)))
    }

    async fn list_collections(&self, filter: CollectionFilter) -> CatalogResult<Vec<Collection>> {
        let state = self.state.read().await;
        let needle = filter.search.as_deref().map(|s| s.trim().to_lowercase());

        let mut result: Vec<Collection> = state
            .collections
            .values()
            .filter(|c| filter.is_published.is_none_or(|p| c.is_published == p))
            .filter(|c| {
                needle
                    .as_deref()
                    .is_none_or(|n| c.title.to_lowercase().contains(n))
            })
            .cloned()
            .map(|c| state.with_count(c))
            .collect();
        result.sort_by(|a, b| a.title.cmp(&b.title));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update_collection(&self, collection: Collection) -> CatalogResult<Collection> {
        let mut state = self.state.write().await;
        if !state.collections.contains_key(&collection.id) {
            return Err(CatalogError::CollectionNotFound(collection.id));
        }
        state.collections.insert(collection.id, collection.clone());
        tracing::info!(collection_id = %collection.id, "Updated collection");
        Ok(state.with_count(collection))
    }

    async fn delete_collection(&self, id: Uuid) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        state.memberships.remove(&id);
        let removed = state.collections.remove(&id).is_some();
        if removed {
            tracing::info!(collection_id = %id, "Deleted collection");
        }
        Ok(removed)
    }

    async fn add_products(
        &self,
        collection_id: Uuid,
        product_ids: Vec<Uuid>,
    ) -> CatalogResult<usize> {
        let mut state = self.state.write().await;
        let members = state.memberships.entry(collection_id).or_default();
        let mut seen: HashSet<Uuid> = members.iter().copied().collect();

        let mut added = 0;
        for id in product_ids {
            if seen.insert(id) {
                members.push(id);
                added += 1;
            }
        }
        Ok(added)
    }

    async fn remove_product(&self, collection_id: Uuid, product_id: Uuid) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        let Some(members) = state.memberships.get_mut(&collection_id) else {
            return Ok(false);
        };
        let before = members.len();
        members.retain(|p| *p != product_id);
        Ok(members.len() != before)
    }

    async fn list_collection_products(&self, collection_id: Uuid) -> CatalogResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut result: Vec<Product> = state
            .memberships
            .get(&collection_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.products.get(id).cloned())
            .collect();
        result.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(result)
    }

    async fn collection_slug_exists(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .values()
            .any(|c| c.slug == slug && Some(c.id) != exclude))
    }

    async fn search_collections(&self, tokens: Vec<String>) -> CatalogResult<Vec<Collection>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .values()
            .filter(|c| contains_any(&c.title, &tokens) || contains_any(&c.description, &tokens))
            .take(SEARCH_CANDIDATE_LIMIT as usize)
            .cloned()
            .map(|c| state.with_count(c))
            .collect())
    }
}
