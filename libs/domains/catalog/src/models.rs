use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static SKU: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());
static CURRENCY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());

pub const DEFAULT_CURRENCY: &str = "USD";

fn validate_sku(sku: &str) -> Result<(), ValidationError> {
    if !SKU.is_match(sku) {
        return Err(ValidationError::new("invalid_sku")
            .with_message("SKU must be 1-64 characters of letters, digits, '-' or '_'".into()));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if !CURRENCY.is_match(currency) {
        return Err(ValidationError::new("invalid_currency")
            .with_message("currency must be a 3-letter uppercase code".into()));
    }
    Ok(())
}

pub fn is_valid_sku(sku: &str) -> bool {
    SKU.is_match(sku)
}

pub fn is_valid_currency(currency: &str) -> bool {
    CURRENCY.is_match(currency)
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// Products

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "product_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProductStatus {
    /// Not visible on the storefront
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductImage {
    #[validate(url, length(max = 2048))]
    pub url: String,
    #[validate(length(max = 255))]
    pub alt: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// Product listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    /// Unique, URL-safe
    pub slug: String,
    /// Unique stock keeping unit
    pub sku: String,
    pub description: String,
    /// Price in minor currency units
    pub price_cents: i64,
    /// "Was" price; never below `price_cents`
    pub compare_at_price_cents: Option<i64>,
    /// ISO 4217 code
    pub currency: String,
    pub stock: i32,
    pub status: ProductStatus,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub images: Vec<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// `slug` must already be unique
    pub fn new(input: CreateProduct, slug: String) -> Self {
        let now = Utc::now();
        let mut images = input.images;
        images.sort_by_key(|i| i.position);

        Self {
            id: Uuid::now_v7(),
            title: input.title.trim().to_string(),
            slug,
            sku: input.sku.trim().to_string(),
            description: input.description,
            price_cents: input.price_cents,
            compare_at_price_cents: input.compare_at_price_cents,
            currency: input
                .currency
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            stock: input.stock,
            status: input.status,
            category_id: input.category_id,
            tags: normalise_tags(input.tags),
            images,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply updates; `slug` is the already de-duplicated new slug, if any
    pub fn apply_update(&mut self, update: UpdateProduct, slug: Option<String>) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(slug) = slug {
            self.slug = slug;
        }
        if let Some(sku) = update.sku {
            self.sku = sku.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price_cents {
            self.price_cents = price;
        }
        if let Some(compare_at) = update.compare_at_price_cents {
            self.compare_at_price_cents = compare_at;
        }
        if let Some(currency) = update.currency {
            self.currency = currency.trim().to_uppercase();
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(category_id) = update.category_id {
            self.category_id = category_id;
        }
        if let Some(tags) = update.tags {
            self.tags = normalise_tags(tags);
        }
        if let Some(mut images) = update.images {
            images.sort_by_key(|i| i.position);
            self.images = images;
        }
        self.updated_at = Utc::now();
    }

    /// Invariants that span fields; checked after every create/update/import
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.price_cents < 0 {
            return Err("price_cents must not be negative".to_string());
        }
        if let Some(compare_at) = self.compare_at_price_cents
            && compare_at < self.price_cents
        {
            return Err("compare_at_price_cents must be at least price_cents".to_string());
        }
        if self.stock < 0 {
            return Err("stock must not be negative".to_string());
        }
        if !is_valid_sku(&self.sku) {
            return Err("SKU must be 1-64 characters of letters, digits, '-' or '_'".to_string());
        }
        if !is_valid_currency(&self.currency) {
            return Err("currency must be a 3-letter uppercase code".to_string());
        }
        if self.title.is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

/// Trimmed, lowercased, deduplicated, order kept
pub fn normalise_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn validate_create_prices(input: &CreateProduct) -> Result<(), ValidationError> {
    match input.compare_at_price_cents {
        Some(compare_at) if compare_at < input.price_cents => Err(ValidationError::new(
            "compare_at_below_price",
        )
        .with_message("compare_at_price_cents must be at least price_cents".into())),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_prices"))]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Derived from the title when omitted
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[validate(custom(function = "validate_sku"))]
    pub sku: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub description: String,
    #[validate(range(min = 0))]
    pub price_cents: i64,
    #[validate(range(min = 0))]
    pub compare_at_price_cents: Option<i64>,
    /// Defaults to USD
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default)]
    pub status: ProductStatus,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 20), nested)]
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[validate(custom(function = "validate_sku"))]
    pub sku: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,
    /// `null` clears the compare-at price
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub compare_at_price_cents: Option<Option<i64>>,
    #[validate(custom(function = "validate_currency"))]
    pub currency: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub status: Option<ProductStatus>,
    /// `null` removes the product from its category
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    #[validate(length(max = 50))]
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 20), nested)]
    pub images: Option<Vec<ProductImage>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub category_id: Option<Uuid>,
    pub collection_id: Option<Uuid>,
    pub tag: Option<String>,
    /// Inclusive, in cents
    pub min_price: Option<i64>,
    /// Inclusive, in cents
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    /// Substring of title or SKU
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Upper bound for any page size
pub const MAX_PAGE_SIZE: usize = 200;

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            status: None,
            category_id: None,
            collection_id: None,
            tag: None,
            min_price: None,
            max_price: None,
            in_stock: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ProductFilter {
    /// Everything, for exports
    pub fn unbounded() -> Self {
        Self {
            limit: usize::MAX,
            ..Default::default()
        }
    }

    /// Everything except `collection_id`, which needs membership data
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(status) = self.status
            && product.status != status
        {
            return false;
        }
        if let Some(category_id) = self.category_id
            && product.category_id != Some(category_id)
        {
            return false;
        }
        if let Some(ref tag) = self.tag
            && !product.tags.iter().any(|t| t.eq_ignore_ascii_case(tag.trim()))
        {
            return false;
        }
        if let Some(min) = self.min_price
            && product.price_cents < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price_cents > max
        {
            return false;
        }
        if let Some(in_stock) = self.in_stock
            && (product.stock > 0) != in_stock
        {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            if !product.title.to_lowercase().contains(&needle)
                && !product.sku.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdjustStock {
    /// Added to the current stock; negative to remove
    #[validate(range(min = -1_000_000, max = 1_000_000))]
    pub delta: i32,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
pub struct LowStockQuery {
    #[serde(default = "default_low_stock_threshold")]
    #[validate(range(min = 0, max = 100000))]
    pub threshold: i32,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200))]
    pub limit: usize,
}

fn default_low_stock_threshold() -> i32 {
    5
}

// Categories

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    /// Sort key among siblings
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(input: CreateCategory, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name.trim().to_string(),
            slug,
            description: input.description,
            parent_id: input.parent_id,
            position: input.position,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateCategory, slug: Option<String>) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(slug) = slug {
            self.slug = slug;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(parent_id) = update.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(position) = update.position {
            self.position = position;
        }
        self.updated_at = Utc::now();
    }
}

/// A category with its sub-tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryNode {
    pub category: Category,
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// `null` moves the category to the root
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CategoryFilter {
    /// Only direct children of this category
    pub parent_id: Option<Uuid>,
    /// Only top-level categories
    #[serde(default)]
    pub root_only: bool,
}

// Collections

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Collection {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub is_published: bool,
    /// Number of member products
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(input: CreateCollection, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: input.title.trim().to_string(),
            slug,
            description: input.description,
            image_url: input.image_url,
            is_published: input.is_published,
            product_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateCollection, slug: Option<String>) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(slug) = slug {
            self.slug = slug;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(image_url) = update.image_url {
            self.image_url = image_url;
        }
        if let Some(is_published) = update.is_published {
            self.is_published = is_published;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCollection {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(url, length(max = 2048))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCollection {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// `null` removes the image
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CollectionFilter {
    pub is_published: Option<bool>,
    /// Substring of the title
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for CollectionFilter {
    fn default() -> Self {
        Self {
            is_published: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddProducts {
    #[validate(length(min = 1, max = 500))]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MembershipChange {
    /// Products newly added (duplicates are not counted)
    pub added: usize,
    pub product_count: i64,
}

// Search

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SearchKind {
    Product,
    Category,
    Collection,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free text; whitespace separated tokens
    pub q: String,
    /// Comma separated kinds; all kinds when omitted
    pub kinds: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchHit {
    pub kind: SearchKind,
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResults {
    /// The trimmed query
    pub query: String,
    /// Hits before `limit` was applied
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create() -> CreateProduct {
        CreateProduct {
            title: "  Linen Shirt ".into(),
            slug: None,
            sku: "SHIRT-01".into(),
            description: String::new(),
            price_cents: 4500,
            compare_at_price_cents: Some(6000),
            currency: Some("eur".into()),
            stock: 3,
            status: ProductStatus::Draft,
            category_id: None,
            tags: vec!["Summer".into(), "summer ".into(), "linen".into()],
            images: vec![],
        }
    }

    #[test]
    fn test_new_product_normalises_fields() {
        let product = Product::new(create(), "linen-shirt".into());
        assert_eq!(product.title, "Linen Shirt");
        assert_eq!(product.currency, "EUR");
        assert_eq!(product.tags, vec!["summer", "linen"]);
        assert!(product.check_invariants().is_ok());
    }

    #[test]
    fn test_compare_at_below_price_fails_validation() {
        let mut input = create();
        input.compare_at_price_cents = Some(100);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_can_clear_nullable_fields() {
        let update: UpdateProduct =
            serde_json::from_str(r#"{"compare_at_price_cents": null}"#).unwrap();
        assert_eq!(update.compare_at_price_cents, Some(None));
        assert_eq!(update.category_id, None);

        let mut product = Product::new(create(), "linen-shirt".into());
        product.apply_update(update, None);
        assert_eq!(product.compare_at_price_cents, None);
    }

    #[test]
    fn test_price_drop_below_compare_at_breaks_invariant() {
        let mut product = Product::new(create(), "linen-shirt".into());
        product.apply_update(
            UpdateProduct {
                price_cents: Some(7000),
                ..Default::default()
            },
            None,
        );
        assert!(product.check_invariants().is_err());
    }

    #[test]
    fn test_sku_rules() {
        assert!(is_valid_sku("TEE_01-blue"));
        assert!(!is_valid_sku("TEE 01"));
        assert!(!is_valid_sku(""));
        assert!(!is_valid_sku(&"A".repeat(65)));
    }

    #[test]
    fn test_filter_matches() {
        let product = Product::new(create(), "linen-shirt".into());
        let filter = ProductFilter {
            tag: Some("SUMMER".into()),
            min_price: Some(4500),
            in_stock: Some(true),
            search: Some("shirt-0".into()),
            ..Default::default()
        };
        assert!(filter.matches(&product));

        let filter = ProductFilter {
            max_price: Some(4499),
            ..Default::default()
        };
        assert!(!filter.matches(&product));
    }
}
