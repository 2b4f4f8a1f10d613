use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{OrderError, OrderResult};

pub const DEFAULT_CURRENCY: &str = "USD";

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Order lifecycle
///
/// ```text
/// pending ──► paid ──► fulfilled ──► shipped ──► delivered
///    │          │          │            │            │
///    ▼          ▼          └────────────┴────────────┴──► refunded
/// cancelled ◄───┘ (paid also ──► refunded)
/// ```
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "order_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OrderStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "fulfilled")]
    Fulfilled,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl OrderStatus {
    /// Statuses reachable in one step
    pub fn next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Paid, Cancelled],
            Paid => &[Fulfilled, Refunded, Cancelled],
            Fulfilled => &[Shipped, Refunded],
            Shipped => &[Delivered, Refunded],
            Delivered => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }

    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        self.next().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_empty()
    }

    /// Only pending or cancelled orders may be deleted
    pub fn is_deletable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Cancelled)
    }

    /// Money has been taken and not returned
    pub fn counts_as_revenue(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Fulfilled
                | OrderStatus::Shipped
                | OrderStatus::Delivered
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItem {
    /// Catalog product, if the line still maps to one
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 100000))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    pub unit_price_cents: i64,
}

impl OrderItem {
    /// `None` when the line total does not fit in an `i64`
    pub fn line_total_cents(&self) -> Option<i64> {
        self.unit_price_cents.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Address {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    /// ISO 3166-1 alpha-2
    #[validate(length(equal = 2))]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    /// Display number, `#` + six digits; assigned by the store
    pub number: String,
    pub customer_id: Option<Uuid>,
    pub customer_email: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    pub discount_code: Option<String>,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    /// subtotal - discount + shipping + tax
    pub total_cents: i64,
    pub currency: String,
    pub shipping_address: Option<Address>,
    pub note: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Totals are derived from the items; `number` is left empty for the store
    pub fn new(input: CreateOrder) -> OrderResult<Self> {
        let now = Utc::now();
        let (subtotal_cents, total_cents) = totals(&input).ok_or_else(|| {
            OrderError::Validation(AMOUNT_OVERFLOW.to_string())
        })?;

        Ok(Self {
            id: Uuid::now_v7(),
            number: String::new(),
            customer_id: input.customer_id,
            customer_email: input.customer_email.trim().to_lowercase(),
            status: OrderStatus::Pending,
            items: input.items,
            subtotal_cents,
            discount_code: input
                .discount_code
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            discount_cents: input.discount_cents,
            shipping_cents: input.shipping_cents,
            tax_cents: input.tax_cents,
            total_cents,
            currency: input
                .currency
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            shipping_address: input.shipping_address,
            note: input.note,
            placed_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: UpdateOrder) {
        if let Some(note) = update.note {
            self.note = note;
        }
        if let Some(address) = update.shipping_address {
            self.shipping_address = address;
        }
        self.updated_at = Utc::now();
    }
}

const AMOUNT_OVERFLOW: &str = "order amounts are too large";

/// Sum of the line totals, `None` on overflow
pub fn subtotal(items: &[OrderItem]) -> Option<i64> {
    items
        .iter()
        .try_fold(0i64, |sum, item| sum.checked_add(item.line_total_cents()?))
}

/// `(subtotal, total)` where total = subtotal - discount + shipping + tax
pub fn totals(input: &CreateOrder) -> Option<(i64, i64)> {
    let subtotal = subtotal(&input.items)?;
    let total = subtotal
        .checked_sub(input.discount_cents)?
        .checked_add(input.shipping_cents)?
        .checked_add(input.tax_cents)?;
    Some((subtotal, total))
}

fn validate_totals(input: &CreateOrder) -> Result<(), ValidationError> {
    let Some((subtotal, _)) = totals(input) else {
        return Err(ValidationError::new("amount_overflow").with_message(AMOUNT_OVERFLOW.into()));
    };
    if input.discount_cents > subtotal {
        return Err(ValidationError::new("discount_exceeds_subtotal")
            .with_message("discount_cents must not exceed the order subtotal".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_totals"))]
pub struct CreateOrder {
    pub customer_id: Option<Uuid>,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 1, max = 200), nested)]
    pub items: Vec<OrderItem>,
    #[validate(length(min = 1, max = 32))]
    pub discount_code: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub discount_cents: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub shipping_cents: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub tax_cents: i64,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(nested)]
    pub shipping_address: Option<Address>,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

/// Only the note and shipping address can change after placement
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrder {
    /// `null` clears the note
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
    /// `null` clears the address
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Address>)]
    pub shipping_address: Option<Option<Address>>,
}

impl UpdateOrder {
    pub fn validate_nested(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        if let Some(Some(ref address)) = self.shipping_address {
            address.validate()?;
        }
        if let Some(Some(ref note)) = self.note
            && note.chars().count() > 2000
        {
            let mut errors = validator::ValidationErrors::new();
            errors.add(
                "note",
                ValidationError::new("length").with_message("note is too long".into()),
            );
            return Err(errors);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransitionOrder {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    /// Exact match, case-insensitive
    pub customer_email: Option<String>,
    /// Inclusive lower bound on `placed_at`
    pub placed_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `placed_at`
    pub placed_to: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

pub const MAX_PAGE_SIZE: usize = 200;

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            customer_id: None,
            customer_email: None,
            placed_from: None,
            placed_to: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl OrderFilter {
    /// Same criteria without paging, for exports
    pub fn unbounded(self) -> Self {
        Self {
            limit: usize::MAX,
            offset: 0,
            ..self
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(customer_id) = self.customer_id
            && order.customer_id != Some(customer_id)
        {
            return false;
        }
        if let Some(ref email) = self.customer_email
            && !order.customer_email.eq_ignore_ascii_case(email.trim())
        {
            return false;
        }
        if let Some(from) = self.placed_from
            && order.placed_at < from
        {
            return false;
        }
        if let Some(to) = self.placed_to
            && order.placed_at >= to
        {
            return false;
        }
        true
    }
}
