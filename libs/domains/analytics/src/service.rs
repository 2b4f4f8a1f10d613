use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::error::AnalyticsResult;
use crate::models::{
    DashboardSummary, LOW_STOCK_THRESHOLD, RangeQuery, SalesPoint, TopProduct, TopProductsQuery,
    fill_days,
};
use crate::repository::AnalyticsRepository;

pub struct AnalyticsService<R: AnalyticsRepository> {
    repository: Arc<R>,
}

impl<R: AnalyticsRepository> Clone for AnalyticsService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: AnalyticsRepository> AnalyticsService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    pub async fn summary(&self, query: RangeQuery) -> AnalyticsResult<DashboardSummary> {
        self.summary_on(query, today()).await
    }

    pub async fn summary_on(
        &self,
        query: RangeQuery,
        today: NaiveDate,
    ) -> AnalyticsResult<DashboardSummary> {
        let range = query.resolve(today)?;
        let repo = &self.repository;
        tracing::debug!(from = %range.from, to = %range.to, "Building dashboard summary");

        let (totals, orders_by_status, new_customers, open_threads, unread, low_stock) = tokio::try_join!(
            repo.revenue_totals(range),
            repo.orders_by_status(range),
            repo.new_customers(range),
            repo.open_threads(),
            repo.unread_contact_messages(),
            repo.low_stock_products(LOW_STOCK_THRESHOLD),
        )?;

        Ok(DashboardSummary {
            range,
            revenue_cents: totals.revenue_cents,
            order_count: orders_by_status.values().sum(),
            average_order_cents: totals.average_cents(),
            orders_by_status,
            new_customers,
            open_threads,
            unread_contact_messages: unread,
            low_stock_products: low_stock,
        })
    }

    pub async fn sales(&self, query: RangeQuery) -> AnalyticsResult<Vec<SalesPoint>> {
        self.sales_on(query, today()).await
    }

    pub async fn sales_on(
        &self,
        query: RangeQuery,
        today: NaiveDate,
    ) -> AnalyticsResult<Vec<SalesPoint>> {
        let range = query.resolve(today)?;
        let sparse = self.repository.daily_sales(range).await?;
        Ok(fill_days(&range, sparse))
    }

    pub async fn top_products(&self, query: TopProductsQuery) -> AnalyticsResult<Vec<TopProduct>> {
        self.top_products_on(query, today()).await
    }

    pub async fn top_products_on(
        &self,
        query: TopProductsQuery,
        today: NaiveDate,
    ) -> AnalyticsResult<Vec<TopProduct>> {
        let range = query.range().resolve(today)?;
        self.repository.top_products(range, query.limit).await
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::repository::{InMemoryAnalytics, MockAnalyticsRepository, OrderFact};
    use chrono::{DateTime, TimeZone};
    use domain_orders::{OrderItem, OrderStatus};
    use sea_orm::DbErr;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn item(sku: &str, title: &str, quantity: i32, unit_price_cents: i64) -> OrderItem {
        OrderItem {
            product_id: None,
            sku: sku.into(),
            title: title.into(),
            quantity,
            unit_price_cents,
        }
    }

    fn order(placed_at: DateTime<Utc>, status: OrderStatus, items: Vec<OrderItem>) -> OrderFact {
        OrderFact {
            placed_at,
            status,
            total_cents: items.iter().filter_map(OrderItem::line_total_cents).sum(),
            items,
        }
    }

    async fn seeded() -> AnalyticsService<InMemoryAnalytics> {
        let repo = InMemoryAnalytics::new();
        repo.record_order(order(
            at(2025, 3, 1, 10),
            OrderStatus::Paid,
            vec![item("TEE", "Tee", 2, 1500)],
        ))
        .await;
        repo.record_order(order(
            at(2025, 3, 3, 23),
            OrderStatus::Delivered,
            vec![item("TEE", "Tee (new)", 1, 1500), item("CAP", "Cap", 1, 2500)],
        ))
        .await;
        repo.record_order(order(
            at(2025, 3, 2, 9),
            OrderStatus::Pending,
            vec![item("CAP", "Cap", 5, 2500)],
        ))
        .await;
        repo.record_order(order(
            at(2025, 3, 2, 12),
            OrderStatus::Refunded,
            vec![item("SOCK", "Sock", 9, 500)],
        ))
        .await;
        repo.record_customer(at(2025, 3, 2, 8)).await;
        repo.record_customer(at(2025, 2, 1, 8)).await;
        repo.record_product(0, false).await;
        repo.record_product(0, true).await;
        repo.record_product(50, false).await;
        repo.set_open_threads(3).await;
        repo.set_unread_contact_messages(1).await;
        AnalyticsService::new(repo)
    }

    fn march_1_to_3() -> RangeQuery {
        RangeQuery {
            from: Some(date("2025-03-01")),
            to: Some(date("2025-03-03")),
        }
    }

    #[tokio::test]
    async fn test_summary_counts_only_revenue_statuses() {
        let service = seeded().await;
        let summary = service
            .summary_on(march_1_to_3(), date("2025-03-31"))
            .await
            .unwrap();

        assert_eq!(summary.revenue_cents, 3000 + 4000);
        assert_eq!(summary.order_count, 4);
        assert_eq!(summary.average_order_cents, 3500);
        assert_eq!(summary.orders_by_status.get("pending"), Some(&1));
        assert_eq!(summary.orders_by_status.get("refunded"), Some(&1));
        assert_eq!(summary.new_customers, 1);
        assert_eq!(summary.open_threads, 3);
        assert_eq!(summary.unread_contact_messages, 1);
        assert_eq!(summary.low_stock_products, 1);
    }

    #[tokio::test]
    async fn test_sales_fills_every_day() {
        let service = seeded().await;
        let sales = service
            .sales_on(march_1_to_3(), date("2025-03-31"))
            .await
            .unwrap();

        assert_eq!(sales.len(), 3);
        assert_eq!(sales[0].revenue_cents, 3000);
        assert_eq!(sales[1].revenue_cents, 0);
        assert_eq!(sales[1].orders, 0);
        assert_eq!(sales[2].orders, 1);
    }

    #[tokio::test]
    async fn test_top_products_by_units() {
        let service = seeded().await;
        let top = service
            .top_products_on(
                TopProductsQuery {
                    from: Some(date("2025-03-01")),
                    to: Some(date("2025-03-03")),
                    limit: 10,
                },
                date("2025-03-31"),
            )
            .await
            .unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].sku, "TEE");
        assert_eq!(top[0].units, 3);
        assert_eq!(top[0].revenue_cents, 4500);
        assert_eq!(top[0].title, "Tee (new)");
        assert_eq!(top[1].sku, "CAP");
    }

    #[tokio::test]
    async fn test_invalid_range_skips_queries() {
        let mock = MockAnalyticsRepository::new();
        let service = AnalyticsService::new(mock);
        let err = service
            .sales_on(
                RangeQuery {
                    from: Some(date("2025-03-02")),
                    to: Some(date("2025-03-01")),
                },
                date("2025-03-31"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidRange(_)));
    }

    #[tokio::test]
    async fn test_database_error_propagates() {
        let mut mock = MockAnalyticsRepository::new();
        mock.expect_daily_sales()
            .returning(|_| Err(AnalyticsError::Database(DbErr::Custom("timeout".into()))));

        let err = AnalyticsService::new(mock)
            .sales_on(RangeQuery::default(), date("2025-03-31"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Database(_)));
    }
}
