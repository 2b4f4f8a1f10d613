use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{DiscountError, DiscountResult};
use crate::models::{
    CreateDiscount, Discount, DiscountFilter, DiscountQuote, MAX_PAGE_SIZE, RejectReason,
    UpdateDiscount, normalise_code,
};
use crate::repository::DiscountRepository;

pub struct DiscountService<R: DiscountRepository> {
    repository: Arc<R>,
}

impl<R: DiscountRepository> Clone for DiscountService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: DiscountRepository> DiscountService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    pub async fn create_discount(&self, input: CreateDiscount) -> DiscountResult<Discount> {
        input
            .validate()
            .map_err(|e| DiscountError::Validation(e.to_string()))?;

        let discount = Discount::new(input);
        discount
            .check_invariants()
            .map_err(DiscountError::Validation)?;
        self.repository.create(discount).await
    }

    pub async fn get_discount(&self, id: Uuid) -> DiscountResult<Discount> {
        self.repository
            .get(id)
            .await?
            .ok_or(DiscountError::NotFound(id))
    }

    pub async fn get_by_code(&self, code: &str) -> DiscountResult<Discount> {
        let code = normalise_code(code);
        self.repository
            .get_by_code(&code)
            .await?
            .ok_or(DiscountError::CodeNotFound(code))
    }

    pub async fn list_discounts(&self, mut filter: DiscountFilter) -> DiscountResult<Vec<Discount>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list(filter).await
    }

    pub async fn update_discount(
        &self,
        id: Uuid,
        input: UpdateDiscount,
    ) -> DiscountResult<Discount> {
        input
            .validate()
            .map_err(|e| DiscountError::Validation(e.to_string()))?;

        let mut discount = self.get_discount(id).await?;
        discount.apply_update(input);
        discount
            .check_invariants()
            .map_err(DiscountError::Validation)?;
        self.repository.update(discount).await
    }

    pub async fn delete_discount(&self, id: Uuid) -> DiscountResult<()> {
        if !self.repository.delete(id).await? {
            return Err(DiscountError::NotFound(id));
        }
        Ok(())
    }

    /// Price a code against a cart without using it up
    pub async fn quote(
        &self,
        code: &str,
        subtotal_cents: i64,
        shipping_cents: i64,
        now: DateTime<Utc>,
    ) -> DiscountResult<DiscountQuote> {
        let discount = self.get_by_code(code).await?;
        discount
            .quote(subtotal_cents, shipping_cents, now)
            .map_err(DiscountError::Rejected)
    }

    /// Count one use of `code`. The increment is conditional in the store,
    /// so concurrent redemptions never pass the usage limit.
    pub async fn redeem(&self, code: &str) -> DiscountResult<Discount> {
        let discount = self.get_by_code(code).await?;
        discount
            .check_usable(Utc::now())
            .map_err(DiscountError::Rejected)?;

        match self.repository.increment_usage(discount.id).await? {
            Some(redeemed) => {
                tracing::info!(
                    discount_id = %redeemed.id,
                    code = %redeemed.code,
                    usage_count = redeemed.usage_count,
                    "Discount redeemed"
                );
                Ok(redeemed)
            }
            None => Err(DiscountError::Rejected(RejectReason::UsageLimitReached)),
        }
    }
}
