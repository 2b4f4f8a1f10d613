use async_trait::async_trait;
use domain_orders::OrderStatus;
use sea_orm::{DatabaseConnection, DbBackend, FromQueryResult, Iterable, Statement, Value};
use std::collections::BTreeMap;

use crate::error::AnalyticsResult;
use crate::models::{DateRange, RevenueTotals, SalesPoint, TopProduct};
use crate::repository::AnalyticsRepository;

const REVENUE_TOTALS: &str = r#"
SELECT COALESCE(SUM(total_cents), 0)::BIGINT AS revenue_cents,
       COUNT(*)::BIGINT AS orders
FROM orders
WHERE placed_at >= $1 AND placed_at < $2 AND status::TEXT = ANY($3)
"#;

const ORDERS_BY_STATUS: &str = r#"
SELECT status::TEXT AS status, COUNT(*)::BIGINT AS orders
FROM orders
WHERE placed_at >= $1 AND placed_at < $2
GROUP BY status
"#;

const NEW_CUSTOMERS: &str = r#"
SELECT COUNT(*)::BIGINT AS count FROM customers WHERE created_at >= $1 AND created_at < $2
"#;

const OPEN_THREADS: &str =
    "SELECT COUNT(*)::BIGINT AS count FROM support_threads WHERE status <> 'closed'";

const UNREAD_CONTACT_MESSAGES: &str =
    "SELECT COUNT(*)::BIGINT AS count FROM contact_messages WHERE status = 'new'";

const LOW_STOCK_PRODUCTS: &str = r#"
SELECT COUNT(*)::BIGINT AS count FROM products WHERE status <> 'archived' AND stock <= $1
"#;

const DAILY_SALES: &str = r#"
SELECT (placed_at AT TIME ZONE 'UTC')::DATE AS date,
       SUM(total_cents)::BIGINT AS revenue_cents,
       COUNT(*)::BIGINT AS orders
FROM orders
WHERE placed_at >= $1 AND placed_at < $2 AND status::TEXT = ANY($3)
GROUP BY 1
ORDER BY 1
"#;

const TOP_PRODUCTS: &str = r#"
SELECT item->>'sku' AS sku,
       (ARRAY_AGG(item->>'title' ORDER BY o.placed_at DESC))[1] AS title,
       SUM((item->>'quantity')::BIGINT)::BIGINT AS units,
       SUM((item->>'quantity')::BIGINT * (item->>'unit_price_cents')::BIGINT)::BIGINT AS revenue_cents
FROM orders o
CROSS JOIN LATERAL jsonb_array_elements(o.items) AS item
WHERE o.placed_at >= $1 AND o.placed_at < $2 AND o.status::TEXT = ANY($3)
GROUP BY item->>'sku'
ORDER BY units DESC, revenue_cents DESC, sku
LIMIT $4
"#;

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    revenue_cents: i64,
    orders: i64,
}

#[derive(Debug, FromQueryResult)]
struct StatusRow {
    status: String,
    orders: i64,
}

#[derive(Debug, FromQueryResult)]
struct SalesRow {
    date: chrono::NaiveDate,
    revenue_cents: i64,
    orders: i64,
}

#[derive(Debug, FromQueryResult)]
struct TopProductRow {
    sku: String,
    title: Option<String>,
    units: i64,
    revenue_cents: i64,
}

/// Dashboard aggregates computed with hand-written SQL across domain tables
pub struct PgAnalyticsRepository {
    db: DatabaseConnection,
}

impl PgAnalyticsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn statement(sql: &str, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
    }

    async fn count(&self, sql: &str, values: Vec<Value>) -> AnalyticsResult<i64> {
        let row = CountRow::find_by_statement(Self::statement(sql, values))
            .one(&self.db)
            .await?;
        Ok(row.map_or(0, |r| r.count))
    }
}

/// Status names that count towards revenue, as stored in `order_status`
fn revenue_statuses() -> Vec<String> {
    OrderStatus::iter()
        .filter(|s| s.counts_as_revenue())
        .map(|s| s.to_string())
        .collect()
}

fn range_values(range: &DateRange) -> Vec<Value> {
    vec![range.start().into(), range.end().into()]
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn revenue_totals(&self, range: DateRange) -> AnalyticsResult<RevenueTotals> {
        let mut values = range_values(&range);
        values.push(revenue_statuses().into());

        let row = TotalsRow::find_by_statement(Self::statement(REVENUE_TOTALS, values))
            .one(&self.db)
            .await?;
        Ok(row.map_or_else(RevenueTotals::default, |r| RevenueTotals {
            revenue_cents: r.revenue_cents,
            orders: r.orders,
        }))
    }

    async fn orders_by_status(&self, range: DateRange) -> AnalyticsResult<BTreeMap<String, i64>> {
        let rows = StatusRow::find_by_statement(Self::statement(
            ORDERS_BY_STATUS,
            range_values(&range),
        ))
        .all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|r| (r.status, r.orders)).collect())
    }

    async fn new_customers(&self, range: DateRange) -> AnalyticsResult<i64> {
        self.count(NEW_CUSTOMERS, range_values(&range)).await
    }

    async fn open_threads(&self) -> AnalyticsResult<i64> {
        self.count(OPEN_THREADS, vec![]).await
    }

    async fn unread_contact_messages(&self) -> AnalyticsResult<i64> {
        self.count(UNREAD_CONTACT_MESSAGES, vec![]).await
    }

    async fn low_stock_products(&self, threshold: i32) -> AnalyticsResult<i64> {
        self.count(LOW_STOCK_PRODUCTS, vec![threshold.into()]).await
    }

    async fn daily_sales(&self, range: DateRange) -> AnalyticsResult<Vec<SalesPoint>> {
        let mut values = range_values(&range);
        values.push(revenue_statuses().into());

        let rows = SalesRow::find_by_statement(Self::statement(DAILY_SALES, values))
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| SalesPoint {
                date: r.date,
                revenue_cents: r.revenue_cents,
                orders: r.orders,
            })
            .collect())
    }

    async fn top_products(&self, range: DateRange, limit: u64) -> AnalyticsResult<Vec<TopProduct>> {
        let mut values = range_values(&range);
        values.push(revenue_statuses().into());
        values.push(i64::try_from(limit).unwrap_or(i64::MAX).into());

        let rows = TopProductRow::find_by_statement(Self::statement(TOP_PRODUCTS, values))
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| TopProduct {
                sku: r.sku,
                title: r.title.unwrap_or_default(),
                units: r.units,
                revenue_cents: r.revenue_cents,
            })
            .collect())
    }
}

