use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9_-]{3,32}$").unwrap());

pub const MAX_PAGE_SIZE: usize = 200;

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn normalise_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate_code(code: &str) -> Result<(), ValidationError> {
    if CODE.is_match(&normalise_code(code)) {
        Ok(())
    } else {
        Err(ValidationError::new("code")
            .with_message("code must be 3-32 characters of A-Z, 0-9, '_' or '-'".into()))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "discount_kind")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a whole percentage, 1..=100
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// `value` is an amount in cents
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
    /// `value` is ignored
    #[sea_orm(string_value = "free_shipping")]
    FreeShipping,
}

/// Why a code cannot be applied right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    Inactive,
    NotStarted,
    Expired,
    UsageLimitReached,
    MinimumNotMet,
}

impl RejectReason {
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::Inactive => "Discount code is not active",
            RejectReason::NotStarted => "Discount code is not valid yet",
            RejectReason::Expired => "Discount code has expired",
            RejectReason::UsageLimitReached => "Discount code has been used up",
            RejectReason::MinimumNotMet => "Order subtotal is below the minimum for this code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Discount {
    pub id: Uuid,
    /// Uppercase, unique
    pub code: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: i64,
    pub min_subtotal_cents: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discount {
    pub fn new(input: CreateDiscount) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            code: normalise_code(&input.code),
            description: input.description,
            kind: input.kind,
            value: effective_value(input.kind, input.value),
            min_subtotal_cents: input.min_subtotal_cents,
            starts_at: input.starts_at.unwrap_or(now),
            ends_at: input.ends_at,
            usage_limit: input.usage_limit,
            usage_count: 0,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateDiscount) {
        if let Some(code) = update.code {
            self.code = normalise_code(&code);
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(value) = update.value {
            self.value = value;
        }
        self.value = effective_value(self.kind, self.value);
        if let Some(min) = update.min_subtotal_cents {
            self.min_subtotal_cents = min;
        }
        if let Some(starts_at) = update.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(ends_at) = update.ends_at {
            self.ends_at = ends_at;
        }
        if let Some(usage_limit) = update.usage_limit {
            self.usage_limit = usage_limit;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }

    /// Rules that span fields, checked after every create or update
    pub fn check_invariants(&self) -> Result<(), String> {
        match self.kind {
            DiscountKind::Percentage if !(1..=100).contains(&self.value) => {
                return Err("percentage value must be between 1 and 100".to_string());
            }
            DiscountKind::FixedAmount if self.value <= 0 => {
                return Err("fixed amount value must be greater than 0".to_string());
            }
            _ => {}
        }
        if let Some(ends_at) = self.ends_at
            && ends_at <= self.starts_at
        {
            return Err("ends_at must be after starts_at".to_string());
        }
        if let Some(limit) = self.usage_limit
            && limit < self.usage_count
        {
            return Err(format!(
                "usage_limit must not be below the current usage count ({})",
                self.usage_count
            ));
        }
        Ok(())
    }

    /// Usability at `now`, ignoring the order subtotal
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), RejectReason> {
        if !self.is_active {
            return Err(RejectReason::Inactive);
        }
        if now < self.starts_at {
            return Err(RejectReason::NotStarted);
        }
        if self.ends_at.is_some_and(|end| now >= end) {
            return Err(RejectReason::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.usage_count >= limit) {
            return Err(RejectReason::UsageLimitReached);
        }
        Ok(())
    }

    pub fn quote(
        &self,
        subtotal_cents: i64,
        shipping_cents: i64,
        now: DateTime<Utc>,
    ) -> Result<DiscountQuote, RejectReason> {
        self.check_usable(now)?;
        if subtotal_cents < self.min_subtotal_cents {
            return Err(RejectReason::MinimumNotMet);
        }

        let (discount_cents, free_shipping) = match self.kind {
            DiscountKind::Percentage => (percent_of(subtotal_cents, self.value), false),
            DiscountKind::FixedAmount => (self.value.min(subtotal_cents), false),
            DiscountKind::FreeShipping => (shipping_cents, true),
        };

        Ok(DiscountQuote {
            discount_id: self.id,
            code: self.code.clone(),
            kind: self.kind,
            discount_cents,
            free_shipping,
        })
    }
}

/// `percent`% of `amount`, rounded down; never more than `amount` for 0..=100
fn percent_of(amount: i64, percent: i64) -> i64 {
    let cents = i128::from(amount) * i128::from(percent) / 100;
    i64::try_from(cents).unwrap_or(amount)
}

fn effective_value(kind: DiscountKind, value: i64) -> i64 {
    match kind {
        DiscountKind::FreeShipping => 0,
        _ => value,
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDiscount {
    #[validate(custom(function = "validate_code"))]
    pub code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub kind: DiscountKind,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub value: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub min_subtotal_cents: i64,
    /// Defaults to now
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDiscount {
    #[validate(custom(function = "validate_code"))]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub kind: Option<DiscountKind>,
    #[validate(range(min = 0))]
    pub value: Option<i64>,
    #[validate(range(min = 0))]
    pub min_subtotal_cents: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    /// `null` removes the end date
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    /// `null` removes the limit
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub usage_limit: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct DiscountFilter {
    /// Match on the `is_active` flag
    pub active: Option<bool>,
    /// Substring of code or description
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for DiscountFilter {
    fn default() -> Self {
        Self {
            active: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl DiscountFilter {
    pub fn matches(&self, discount: &Discount) -> bool {
        if let Some(active) = self.active
            && discount.is_active != active
        {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            let in_code = discount.code.to_lowercase().contains(&needle);
            let in_description = discount
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_code && !in_description {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct QuoteRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(range(min = 0))]
    pub subtotal_cents: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub shipping_cents: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RedeemRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiscountQuote {
    pub discount_id: Uuid,
    pub code: String,
    pub kind: DiscountKind,
    pub discount_cents: i64,
    pub free_shipping: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn discount(kind: DiscountKind, value: i64) -> Discount {
        Discount::new(CreateDiscount {
            code: " spring-10 ".into(),
            description: None,
            kind,
            value,
            min_subtotal_cents: 2000,
            starts_at: Some(Utc::now() - Duration::days(1)),
            ends_at: None,
            usage_limit: Some(2),
            is_active: true,
        })
    }

    #[test]
    fn test_code_rules() {
        assert!(validate_code("spring_10").is_ok());
        assert!(validate_code("AB").is_err());
        assert!(validate_code("TEN OFF").is_err());
        assert!(validate_code(&"X".repeat(33)).is_err());
        assert_eq!(discount(DiscountKind::Percentage, 10).code, "SPRING-10");
    }

    #[test]
    fn test_amounts_per_kind() {
        let now = Utc::now();

        let pct = discount(DiscountKind::Percentage, 15).quote(3333, 500, now).unwrap();
        assert_eq!(pct.discount_cents, 499);
        assert!(!pct.free_shipping);

        let fixed = discount(DiscountKind::FixedAmount, 5000).quote(2500, 500, now).unwrap();
        assert_eq!(fixed.discount_cents, 2500);

        let ship = discount(DiscountKind::FreeShipping, 999).quote(2500, 650, now).unwrap();
        assert_eq!(ship.discount_cents, 650);
        assert!(ship.free_shipping);
    }

    #[test]
    fn test_percentage_of_huge_subtotal() {
        let now = Utc::now();
        let request = QuoteRequest {
            code: "SPRING-10".into(),
            subtotal_cents: i64::MAX / 10,
            shipping_cents: 0,
        };
        assert!(request.validate().is_ok());

        let half = discount(DiscountKind::Percentage, 50)
            .quote(request.subtotal_cents, request.shipping_cents, now)
            .unwrap();
        assert_eq!(half.discount_cents, i64::MAX / 20);

        let all = discount(DiscountKind::Percentage, 100).quote(i64::MAX, 0, now).unwrap();
        assert_eq!(all.discount_cents, i64::MAX);
    }

    #[test]
    fn test_reject_reasons() {
        let now = Utc::now();

        let mut d = discount(DiscountKind::Percentage, 10);
        assert_eq!(d.quote(1999, 0, now), Err(RejectReason::MinimumNotMet));

        d.usage_count = 2;
        assert_eq!(d.quote(5000, 0, now), Err(RejectReason::UsageLimitReached));

        d.ends_at = Some(now - Duration::minutes(1));
        assert_eq!(d.quote(5000, 0, now), Err(RejectReason::Expired));

        d.starts_at = now + Duration::hours(1);
        assert_eq!(d.quote(5000, 0, now), Err(RejectReason::NotStarted));

        d.is_active = false;
        assert_eq!(d.quote(5000, 0, now), Err(RejectReason::Inactive));
    }

    #[test]
    fn test_invariants() {
        assert!(discount(DiscountKind::Percentage, 0).check_invariants().is_err());
        assert!(discount(DiscountKind::Percentage, 101).check_invariants().is_err());
        assert!(discount(DiscountKind::FixedAmount, 0).check_invariants().is_err());
        assert!(discount(DiscountKind::FreeShipping, 0).check_invariants().is_ok());

        let mut d = discount(DiscountKind::Percentage, 10);
        d.ends_at = Some(d.starts_at);
        assert!(d.check_invariants().is_err());
    }

    #[test]
    fn test_free_shipping_value_is_ignored() {
        assert_eq!(discount(DiscountKind::FreeShipping, 999).value, 0);
    }
}
