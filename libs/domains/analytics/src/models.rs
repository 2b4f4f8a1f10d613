use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Window used when `from` is omitted
pub const DEFAULT_RANGE_DAYS: u64 = 30;

/// Longest accepted window, both ends included
pub const MAX_RANGE_DAYS: i64 = 366;

/// Non-archived products at or below this stock count as low
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// `?from=&to=` as calendar dates (UTC), both inclusive
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema, IntoParams)]
pub struct RangeQuery {
    /// Defaults to 29 days before `to`
    pub from: Option<NaiveDate>,
    /// Defaults to today
    pub to: Option<NaiveDate>,
}

impl RangeQuery {
    pub fn resolve(self, today: NaiveDate) -> AnalyticsResult<DateRange> {
        let to = self.to.unwrap_or(today);
        let from = match self.from {
            Some(from) => from,
            None => to
                .checked_sub_days(Days::new(DEFAULT_RANGE_DAYS - 1))
                .ok_or_else(|| AnalyticsError::InvalidRange("to is out of range".into()))?,
        };

        if from > to {
            return Err(AnalyticsError::InvalidRange(format!(
                "from ({from}) is after to ({to})"
            )));
        }
        let days = (to - from).num_days() + 1;
        if days > MAX_RANGE_DAYS {
            return Err(AnalyticsError::InvalidRange(format!(
                "range spans {days} days; at most {MAX_RANGE_DAYS} are allowed"
            )));
        }

        Ok(DateRange { from, to })
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Validate, ToSchema, IntoParams)]
pub struct TopProductsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default = "default_top_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
}

fn default_top_limit() -> u64 {
    10
}

impl TopProductsQuery {
    pub fn range(&self) -> RangeQuery {
        RangeQuery {
            from: self.from,
            to: self.to,
        }
    }
}

/// Validated, inclusive date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Midnight UTC at the start of `from`
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC after `to`; exclusive
    pub fn end(&self) -> DateTime<Utc> {
        self.to
            .checked_add_days(Days::new(1))
            .unwrap_or(self.to)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start() && at < self.end()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.from.iter_days().take_while(|d| *d <= self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub range: DateRange,
    /// Orders that are paid or further along
    pub revenue_cents: i64,
    /// Every order placed in the range, whatever its status
    pub order_count: i64,
    /// Revenue divided by the number of revenue orders, floored
    pub average_order_cents: i64,
    /// Status name -> orders placed in the range
    pub orders_by_status: BTreeMap<String, i64>,
    pub new_customers: i64,
    /// Threads not yet closed; not limited to the range
    pub open_threads: i64,
    /// Contact messages still `new`; not limited to the range
    pub unread_contact_messages: i64,
    /// Not limited to the range
    pub low_stock_products: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SalesPoint {
    pub date: NaiveDate,
    pub revenue_cents: i64,
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TopProduct {
    pub sku: String,
    /// Title on the most recent order line
    pub title: String,
    pub units: i64,
    pub revenue_cents: i64,
}

/// Revenue and order count of revenue-bearing orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevenueTotals {
    pub revenue_cents: i64,
    pub orders: i64,
}

impl RevenueTotals {
    pub fn average_cents(&self) -> i64 {
        if self.orders == 0 {
            0
        } else {
            self.revenue_cents / self.orders
        }
    }
}

/// One point per day of `range`; days missing from `sparse` become zeros
pub fn fill_days(range: &DateRange, sparse: Vec<SalesPoint>) -> Vec<SalesPoint> {
    let by_day: BTreeMap<NaiveDate, SalesPoint> =
        sparse.into_iter().map(|p| (p.date, p)).collect();

    range
        .days()
        .map(|date| {
            by_day.get(&date).copied().unwrap_or(SalesPoint {
                date,
                revenue_cents: 0,
                orders: 0,
            })
        })
        .collect()
}
