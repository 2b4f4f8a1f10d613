use database::text::{slug_candidate, slugify};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    AddProducts, AdjustStock, Category, CategoryFilter, CategoryNode, Collection,
    CollectionFilter, CreateCategory, CreateCollection, CreateProduct, MAX_PAGE_SIZE,
    MembershipChange, Product, ProductFilter, ProductStatus, UpdateCategory, UpdateCollection,
    UpdateProduct,
};
use crate::repository::{CatalogRepository, ProductRepository};

/// Give up looking for a free slug after this many suffixes
const MAX_SLUG_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, Copy)]
pub(crate) enum SlugScope {
    Product,
    Category,
    Collection,
}

/// Service layer for products, categories and collections
pub struct CatalogService<R: CatalogRepository> {
    pub(crate) repository: Arc<R>,
}

impl<R: CatalogRepository> Clone for CatalogService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    // Products

    pub async fn create_product(&self, input: CreateProduct) -> CatalogResult<Product> {
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let source = input.slug.clone().unwrap_or_else(|| input.title.clone());
        let slug = self.unique_slug(SlugScope::Product, &source, None).await?;

        let product = Product::new(input, slug);
        product.check_invariants().map_err(CatalogError::Validation)?;

        self.repository.create_product(product).await
    }

    pub async fn get_product(&self, id: Uuid) -> CatalogResult<Product> {
        self.repository
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    pub async fn get_product_by_slug(&self, slug: &str) -> CatalogResult<Product> {
        self.repository
            .get_product_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::ProductSlugNotFound(slug.to_string()))
    }

    pub async fn list_products(&self, mut filter: ProductFilter) -> CatalogResult<Vec<Product>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list_products(filter).await
    }

    /// A new title keeps the existing slug; only an explicit slug changes it
    pub async fn update_product(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product> {
        let mut product = self.get_product(id).await?;

        if let Some(Some(category_id)) = input.category_id {
            self.get_category(category_id).await?;
        }

        let slug = match input.slug {
            Some(ref requested) if slugify(requested) != product.slug => Some(
                self.unique_slug(SlugScope::Product, requested, Some(id))
                    .await?,
            ),
            _ => None,
        };

        product.apply_update(input, slug);
        product.check_invariants().map_err(CatalogError::Validation)?;

        self.repository.update_product(product).await
    }

    pub async fn delete_product(&self, id: Uuid) -> CatalogResult<()> {
        if !self.repository.delete_product(id).await? {
            return Err(CatalogError::ProductNotFound(id));
        }
        Ok(())
    }

    pub async fn adjust_stock(&self, id: Uuid, input: AdjustStock) -> CatalogResult<Product> {
        let product = self.repository.adjust_stock(id, input.delta).await?;
        tracing::info!(
            product_id = %id,
            delta = input.delta,
            stock = product.stock,
            reason = %input.reason,
            "Adjusted stock"
        );
        Ok(product)
    }

    pub async fn publish_product(&self, id: Uuid) -> CatalogResult<Product> {
        self.set_status(id, ProductStatus::Active).await
    }

    pub async fn archive_product(&self, id: Uuid) -> CatalogResult<Product> {
        self.set_status(id, ProductStatus::Archived).await
    }

    async fn set_status(&self, id: Uuid, status: ProductStatus) -> CatalogResult<Product> {
        let mut product = self.get_product(id).await?;
        if product.status == status {
            return Ok(product);
        }
        product.apply_update(
            UpdateProduct {
                status: Some(status),
                ..Default::default()
            },
            None,
        );
        self.repository.update_product(product).await
    }

    pub async fn low_stock(&self, threshold: i32, limit: usize) -> CatalogResult<Vec<Product>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE) as u64;
        self.repository.low_stock(threshold, limit).await
    }

    // Categories

    pub async fn create_category(&self, input: CreateCategory) -> CatalogResult<Category> {
        if let Some(parent_id) = input.parent_id {
            self.get_category(parent_id).await?;
        }

        let source = input.slug.clone().unwrap_or_else(|| input.name.clone());
        let slug = self.unique_slug(SlugScope::Category, &source, None).await?;

        self.repository
            .create_category(Category::new(input, slug))
            .await
    }

    pub async fn get_category(&self, id: Uuid) -> CatalogResult<Category> {
        self.repository
            .get_category(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))
    }

    pub async fn list_categories(&self, filter: CategoryFilter) -> CatalogResult<Vec<Category>> {
        self.repository.list_categories(filter).await
    }

    /// Every category nested under its parent, siblings by position then name
    pub async fn category_tree(&self) -> CatalogResult<Vec<CategoryNode>> {
        let all = self
            .repository
            .list_categories(CategoryFilter::default())
            .await?;
        Ok(build_tree(all))
    }

    pub async fn update_category(&self, id: Uuid, input: UpdateCategory) -> CatalogResult<Category> {
        let mut category = self.get_category(id).await?;

        if let Some(Some(parent_id)) = input.parent_id {
            self.ensure_no_cycle(id, parent_id).await?;
        }

        let slug = match input.slug {
            Some(ref requested) if slugify(requested) != category.slug => Some(
                self.unique_slug(SlugScope::Category, requested, Some(id))
                    .await?,
            ),
            _ => None,
        };

        category.apply_update(input, slug);
        self.repository.update_category(category).await
    }

    /// Rejects moving `id` below itself or one of its descendants
    async fn ensure_no_cycle(&self, id: Uuid, new_parent: Uuid) -> CatalogResult<()> {
        if new_parent == id {
            return Err(CatalogError::CategoryCycle(id));
        }
        self.get_category(new_parent).await?;

        let parents: HashMap<Uuid, Option<Uuid>> = self
            .repository
            .list_categories(CategoryFilter::default())
            .await?
            .into_iter()
            .map(|c| (c.id, c.parent_id))
            .collect();

        let mut visited = HashSet::new();
        let mut current = Some(new_parent);
        while let Some(cursor) = current {
            if cursor == id {
                return Err(CatalogError::CategoryCycle(id));
            }
            if !visited.insert(cursor) {
                break;
            }
            current = parents.get(&cursor).copied().flatten();
        }
        Ok(())
    }

    pub async fn delete_category(&self, id: Uuid) -> CatalogResult<()> {
        self.get_category(id).await?;
        if self.repository.has_children(id).await? {
            return Err(CatalogError::CategoryHasChildren(id));
        }
        if !self.repository.delete_category(id).await? {
            return Err(CatalogError::CategoryNotFound(id));
        }
        Ok(())
    }

    // Collections

    pub async fn create_collection(&self, input: CreateCollection) -> CatalogResult<Collection> {
        let source = input.slug.clone().unwrap_or_else(|| input.title.clone());
        let slug = self.unique_slug(SlugScope::Collection, &source, None).await?;

        self.repository
            .create_collection(Collection::new(input, slug))
            .await
    }

    pub async fn get_collection(&self, id: Uuid) -> CatalogResult<Collection> {
        self.repository
            .get_collection(id)
            .await?
            .ok_or(CatalogError::CollectionNotFound(id))
    }

    pub async fn list_collections(
        &self,
        mut filter: CollectionFilter,
    ) -> CatalogResult<Vec<Collection>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list_collections(filter).await
    }

    pub async fn update_collection(
        &self,
        id: Uuid,
        input: UpdateCollection,
    ) -> CatalogResult<Collection> {
        let mut collection = self.get_collection(id).await?;

        let slug = match input.slug {
            Some(ref requested) if slugify(requested) != collection.slug => Some(
                self.unique_slug(SlugScope::Collection, requested, Some(id))
                    .await?,
            ),
            _ => None,
        };

        collection.apply_update(input, slug);
        self.repository.update_collection(collection).await
    }

    pub async fn delete_collection(&self, id: Uuid) -> CatalogResult<()> {
        if !self.repository.delete_collection(id).await? {
            return Err(CatalogError::CollectionNotFound(id));
        }
        Ok(())
    }

    /// All ids must exist; ids already in the collection are ignored
    pub async fn add_products(
        &self,
        collection_id: Uuid,
        input: AddProducts,
    ) -> CatalogResult<MembershipChange> {
        self.get_collection(collection_id).await?;
        ensure_products_exist(self.repository.as_ref(), &input.product_ids).await?;

        let added = self
            .repository
            .add_products(collection_id, input.product_ids)
            .await?;
        let collection = self.get_collection(collection_id).await?;

        Ok(MembershipChange {
            added,
            product_count: collection.product_count,
        })
    }

    pub async fn remove_product(&self, collection_id: Uuid, product_id: Uuid) -> CatalogResult<()> {
        self.get_collection(collection_id).await?;
        if !self
            .repository
            .remove_product(collection_id, product_id)
            .await?
        {
            return Err(CatalogError::ProductNotFound(product_id));
        }
        Ok(())
    }

    pub async fn list_collection_products(&self, collection_id: Uuid) -> CatalogResult<Vec<Product>> {
        self.get_collection(collection_id).await?;
        self.repository.list_collection_products(collection_id).await
    }

    // Slugs

    /// Slugify `source` and append `-2`, `-3`, ... until it is free
    pub(crate) async fn unique_slug(
        &self,
        scope: SlugScope,
        source: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<String> {
        let base = slugify(source);
        if base.is_empty() {
            return Err(CatalogError::Validation(
                "slug must contain at least one letter or digit".to_string(),
            ));
        }

        for n in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = slug_candidate(&base, n);
            let taken = match scope {
                SlugScope::Product => {
                    self.repository
                        .product_slug_exists(&candidate, exclude)
                        .await?
                }
                SlugScope::Category => {
                    self.repository
                        .category_slug_exists(&candidate, exclude)
                        .await?
                }
                SlugScope::Collection => {
                    self.repository
                        .collection_slug_exists(&candidate, exclude)
                        .await?
                }
            };
            if !taken {
                return Ok(candidate);
            }
        }

        Err(CatalogError::Validation(format!(
            "no free slug left for '{base}'"
        )))
    }
}

/// Fails with the ids that do not exist, in request order
pub(crate) async fn ensure_products_exist<P: ProductRepository + ?Sized>(
    repository: &P,
    ids: &[Uuid],
) -> CatalogResult<()> {
    let found: HashSet<Uuid> = repository
        .existing_product_ids(ids.to_vec())
        .await?
        .into_iter()
        .collect();

    let mut missing: Vec<Uuid> = Vec::new();
    for id in ids {
        if !found.contains(id) && !missing.contains(id) {
            missing.push(*id);
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::UnknownProducts(missing))
    }
}

/// Categories whose parent is missing are treated as roots
fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<Uuid>, Vec<Category>> = HashMap::new();

    for category in categories {
        let parent = category.parent_id.filter(|p| ids.contains(p));
        children.entry(parent).or_default().push(category);
    }

    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
    }

    fn attach(
        parent: Option<Uuid>,
        children: &mut HashMap<Option<Uuid>, Vec<Category>>,
    ) -> Vec<CategoryNode> {
        children
            .remove(&parent)
            .unwrap_or_default()
            .into_iter()
            .map(|category| {
                let id = category.id;
                CategoryNode {
                    category,
                    children: attach(Some(id), children),
                }
            })
            .collect()
    }

    attach(None, &mut children)
}
