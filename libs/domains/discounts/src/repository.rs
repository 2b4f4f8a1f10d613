use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DiscountError, DiscountResult};
use crate::models::{Discount, DiscountFilter};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscountRepository: Send + Sync {
    /// Insert a discount; the code must be free
    async fn create(&self, discount: Discount) -> DiscountResult<Discount>;

    async fn get(&self, id: Uuid) -> DiscountResult<Option<Discount>>;

    /// `code` must already be uppercased
    async fn get_by_code(&self, code: &str) -> DiscountResult<Option<Discount>>;

    /// Newest first
    async fn list(&self, filter: DiscountFilter) -> DiscountResult<Vec<Discount>>;

    async fn update(&self, discount: Discount) -> DiscountResult<Discount>;

    async fn delete(&self, id: Uuid) -> DiscountResult<bool>;

    /// Add one use in a single step, unless the usage limit is already
    /// reached. `None` when nothing was incremented.
    async fn increment_usage(&self, id: Uuid) -> DiscountResult<Option<Discount>>;
}

#[derive(Clone, Default)]
pub struct InMemoryDiscounts {
    discounts: Arc<RwLock<HashMap<Uuid, Discount>>>,
}

impl InMemoryDiscounts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiscountRepository for InMemoryDiscounts {
    async fn create(&self, discount: Discount) -> DiscountResult<Discount> {
        let mut discounts = self.discounts.write().await;

        if discounts.values().any(|d| d.code == discount.code) {
            return Err(DiscountError::DuplicateCode(discount.code));
        }

        discounts.insert(discount.id, discount.clone());
        tracing::info!(discount_id = %discount.id, code = %discount.code, "Created discount");
        Ok(discount)
    }

    async fn get(&self, id: Uuid) -> DiscountResult<Option<Discount>> {
        Ok(self.discounts.read().await.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> DiscountResult<Option<Discount>> {
        Ok(self
            .discounts
            .read()
            .await
            .values()
            .find(|d| d.code == code)
            .cloned())
    }

    async fn list(&self, filter: DiscountFilter) -> DiscountResult<Vec<Discount>> {
        let discounts = self.discounts.read().await;

        let mut result: Vec<Discount> = discounts
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update(&self, discount: Discount) -> DiscountResult<Discount> {
        let mut discounts = self.discounts.write().await;

        if !discounts.contains_key(&discount.id) {
            return Err(DiscountError::NotFound(discount.id));
        }
        if discounts
            .values()
            .any(|d| d.code == discount.code && d.id != discount.id)
        {
            return Err(DiscountError::DuplicateCode(discount.code));
        }

        discounts.insert(discount.id, discount.clone());
        Ok(discount)
    }

    async fn delete(&self, id: Uuid) -> DiscountResult<bool> {
        Ok(self.discounts.write().await.remove(&id).is_some())
    }

    async fn increment_usage(&self, id: Uuid) -> DiscountResult<Option<Discount>> {
        let mut discounts = self.discounts.write().await;

        Ok(discounts
            .get_mut(&id)
            .filter(|d| d.usage_limit.is_none_or(|limit| d.usage_count < limit))
            .map(|d| {
                d.usage_count += 1;
                d.updated_at = Utc::now();
                d.clone()
            }))
    }
}
