use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_orders::{OrderItem, OrderStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AnalyticsResult;
use crate::models::{DateRange, RevenueTotals, SalesPoint, TopProduct};

/// Read-only aggregates over orders, customers, products, threads and
/// contact messages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn revenue_totals(&self, range: DateRange) -> AnalyticsResult<RevenueTotals>;

    /// Status name -> orders placed in the range
    async fn orders_by_status(&self, range: DateRange) -> AnalyticsResult<BTreeMap<String, i64>>;

    async fn new_customers(&self, range: DateRange) -> AnalyticsResult<i64>;

    async fn open_threads(&self) -> AnalyticsResult<i64>;

    async fn unread_contact_messages(&self) -> AnalyticsResult<i64>;

    async fn low_stock_products(&self, threshold: i32) -> AnalyticsResult<i64>;

    /// Only days with revenue orders; the service fills the gaps
    async fn daily_sales(&self, range: DateRange) -> AnalyticsResult<Vec<SalesPoint>>;

    /// Most units first, then most revenue
    async fn top_products(&self, range: DateRange, limit: u64) -> AnalyticsResult<Vec<TopProduct>>;
}

/// What the in-memory store keeps about an order
#[derive(Debug, Clone)]
pub struct OrderFact {
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Default)]
struct Facts {
    orders: Vec<OrderFact>,
    customers_created: Vec<DateTime<Utc>>,
    open_threads: i64,
    unread_contact_messages: i64,
    /// (stock, archived)
    products: Vec<(i32, bool)>,
}

/// In-memory implementation fed with facts directly (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryAnalytics {
    facts: Arc<RwLock<Facts>>,
}

impl InMemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_order(&self, order: OrderFact) {
        self.facts.write().await.orders.push(order);
    }

    pub async fn record_customer(&self, created_at: DateTime<Utc>) {
        self.facts.write().await.customers_created.push(created_at);
    }

    pub async fn record_product(&self, stock: i32, archived: bool) {
        self.facts.write().await.products.push((stock, archived));
    }

    pub async fn set_open_threads(&self, count: i64) {
        self.facts.write().await.open_threads = count;
    }

    pub async fn set_unread_contact_messages(&self, count: i64) {
        self.facts.write().await.unread_contact_messages = count;
    }
}

fn revenue_orders<'a>(
    facts: &'a Facts,
    range: &'a DateRange,
) -> impl Iterator<Item = &'a OrderFact> + 'a {
    facts
        .orders
        .iter()
        .filter(move |o| range.contains(o.placed_at) && o.status.counts_as_revenue())
}

#[async_trait]
impl AnalyticsRepository for InMemoryAnalytics {
    async fn revenue_totals(&self, range: DateRange) -> AnalyticsResult<RevenueTotals> {
        let facts = self.facts.read().await;
        Ok(revenue_orders(&facts, &range).fold(RevenueTotals::default(), |mut acc, o| {
            acc.revenue_cents += o.total_cents;
            acc.orders += 1;
            acc
        }))
    }

    async fn orders_by_status(&self, range: DateRange) -> AnalyticsResult<BTreeMap<String, i64>> {
        let facts = self.facts.read().await;
        let mut counts = BTreeMap::new();
        for order in facts.orders.iter().filter(|o| range.contains(o.placed_at)) {
            *counts.entry(order.status.to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn new_customers(&self, range: DateRange) -> AnalyticsResult<i64> {
        let facts = self.facts.read().await;
        Ok(facts
            .customers_created
            .iter()
            .filter(|at| range.contains(**at))
            .count() as i64)
    }

    async fn open_threads(&self) -> AnalyticsResult<i64> {
        Ok(self.facts.read().await.open_threads)
    }

    async fn unread_contact_messages(&self) -> AnalyticsResult<i64> {
        Ok(self.facts.read().await.unread_contact_messages)
    }

    async fn low_stock_products(&self, threshold: i32) -> AnalyticsResult<i64> {
        let facts = self.facts.read().await;
        Ok(facts
            .products
            .iter()
            .filter(|(stock, archived)| !archived && *stock <= threshold)
            .count() as i64)
    }

    async fn daily_sales(&self, range: DateRange) -> AnalyticsResult<Vec<SalesPoint>> {
        let facts = self.facts.read().await;
        let mut by_day: BTreeMap<chrono::NaiveDate, SalesPoint> = BTreeMap::new();
        for order in revenue_orders(&facts, &range) {
            let date = order.placed_at.date_naive();
            let point = by_day.entry(date).or_insert(SalesPoint {
                date,
                revenue_cents: 0,
                orders: 0,
            });
            point.revenue_cents += order.total_cents;
            point.orders += 1;
        }
        Ok(by_day.into_values().collect())
    }

    async fn top_products(&self, range: DateRange, limit: u64) -> AnalyticsResult<Vec<TopProduct>> {
        let facts = self.facts.read().await;

        let mut orders: Vec<&OrderFact> = revenue_orders(&facts, &range).collect();
        orders.sort_by_key(|o| o.placed_at);

        let mut by_sku: HashMap<String, TopProduct> = HashMap::new();
        for item in orders.iter().flat_map(|o| o.items.iter()) {
            let entry = by_sku.entry(item.sku.clone()).or_insert_with(|| TopProduct {
                sku: item.sku.clone(),
                title: String::new(),
                units: 0,
                revenue_cents: 0,
            });
            entry.title = item.title.clone();
            entry.units += i64::from(item.quantity);
            entry.revenue_cents = entry
                .revenue_cents
                .saturating_add(item.line_total_cents().unwrap_or(i64::MAX));
        }

        let mut result: Vec<TopProduct> = by_sku.into_values().collect();
        result.sort_by(|a, b| {
            b.units
                .cmp(&a.units)
                .then(b.revenue_cents.cmp(&a.revenue_cents))
                .then(a.sku.cmp(&b.sku))
        });
        result.truncate(limit as usize);
        Ok(result)
    }
}
