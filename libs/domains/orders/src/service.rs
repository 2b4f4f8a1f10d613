use axum_helpers::csv_io::{format_cents, join_list};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{OrderError, OrderResult};
use crate::models::{
    CreateOrder, MAX_PAGE_SIZE, Order, OrderFilter, OrderStatus, UpdateOrder,
};
use crate::repository::OrderRepository;

pub const EXPORT_COLUMNS: [&str; 11] = [
    "number",
    "placed_at",
    "status",
    "customer_email",
    "items",
    "subtotal",
    "discount",
    "shipping",
    "tax",
    "total",
    "currency",
];

pub struct OrderService<R: OrderRepository> {
    repository: Arc<R>,
}

impl<R: OrderRepository> Clone for OrderService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Totals are recomputed from the items; any client-side totals are ignored
    pub async fn create_order(&self, input: CreateOrder) -> OrderResult<Order> {
        input
            .validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        let order = Order::new(input)?;
        if order.total_cents < 0 {
            return Err(OrderError::Validation(
                "order total must not be negative".to_string(),
            ));
        }
        self.repository.create(order).await
    }

    pub async fn get_order(&self, id: Uuid) -> OrderResult<Order> {
        self.repository
            .get(id)
            .await?
            .ok_or(OrderError::NotFound(id))
    }

    pub async fn list_orders(&self, mut filter: OrderFilter) -> OrderResult<Vec<Order>> {
        check_range(&filter)?;
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list(filter).await
    }

    pub async fn update_order(&self, id: Uuid, input: UpdateOrder) -> OrderResult<Order> {
        input
            .validate_nested()
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        let mut order = self.get_order(id).await?;
        order.apply_update(input);
        self.repository.update(order).await
    }

    /// Moves the order along the status machine. A concurrent change between
    /// the read and the write is reported as an invalid transition from the
    /// status that won.
    pub async fn transition(&self, id: Uuid, to: OrderStatus) -> OrderResult<Order> {
        let order = self.get_order(id).await?;
        let from = order.status;

        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        match self.repository.set_status(id, from, to).await? {
            Some(updated) => {
                tracing::info!(order_id = %id, %from, %to, "Order status changed");
                Ok(updated)
            }
            None => {
                let current = self.get_order(id).await?;
                Err(OrderError::InvalidTransition {
                    from: current.status,
                    to,
                })
            }
        }
    }

    pub async fn delete_order(&self, id: Uuid) -> OrderResult<()> {
        let order = self.get_order(id).await?;
        if !order.status.is_deletable() {
            return Err(OrderError::NotDeletable(order.status));
        }
        if !self.repository.delete(id).await? {
            return Err(OrderError::NotFound(id));
        }
        Ok(())
    }

    /// All orders matching `filter`, paging ignored
    pub async fn export_orders(&self, filter: OrderFilter) -> OrderResult<String> {
        check_range(&filter)?;
        let orders = self.repository.list(filter.unbounded()).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(EXPORT_COLUMNS)?;

        for order in &orders {
            let placed_at = order.placed_at.to_rfc3339();
            let status = order.status.to_string();
            let lines: Vec<String> = order
                .items
                .iter()
                .map(|item| format!("{} x{}", item.sku, item.quantity))
                .collect();
            let items = join_list(&lines);
            let subtotal = format_cents(order.subtotal_cents);
            let discount = format_cents(order.discount_cents);
            let shipping = format_cents(order.shipping_cents);
            let tax = format_cents(order.tax_cents);
            let total = format_cents(order.total_cents);

            writer.write_record([
                order.number.as_str(),
                placed_at.as_str(),
                status.as_str(),
                order.customer_email.as_str(),
                items.as_str(),
                subtotal.as_str(),
                discount.as_str(),
                shipping.as_str(),
                tax.as_str(),
                total.as_str(),
                order.currency.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        tracing::info!(rows = orders.len(), "Exported orders");
        String::from_utf8(bytes).map_err(|e| OrderError::Validation(e.to_string()))
    }
}

fn check_range(filter: &OrderFilter) -> OrderResult<()> {
    if let (Some(from), Some(to)) = (filter.placed_from, filter.placed_to)
        && from > to
    {
        return Err(OrderError::Validation(
            "placed_from must not be after placed_to".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, OrderItem};
    use crate::repository::{InMemoryOrders, MockOrderRepository};
    use sea_orm::DbErr;

    fn input(email: &str) -> CreateOrder {
        CreateOrder {
            customer_id: None,
            customer_email: email.into(),
            items: vec![
                OrderItem {
                    product_id: None,
                    sku: "MUG-1".into(),
                    title: "Mug".into(),
                    quantity: 2,
                    unit_price_cents: 1500,
                },
                OrderItem {
                    product_id: Some(Uuid::now_v7()),
                    sku: "TEE-1".into(),
                    title: "Tee".into(),
                    quantity: 1,
                    unit_price_cents: 2000,
                },
            ],
            discount_code: Some("spring".into()),
            discount_cents: 1000,
            shipping_cents: 500,
            tax_cents: 250,
            currency: Some("eur".into()),
            shipping_address: None,
            note: None,
        }
    }

    fn service() -> OrderService<InMemoryOrders> {
        OrderService::new(InMemoryOrders::new())
    }

    #[tokio::test]
    async fn test_create_computes_totals_and_number() {
        let service = service();
        let order = service.create_order(input("ana@shop.test")).await.unwrap();

        assert_eq!(order.number, "#001001");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal_cents, 5000);
        assert_eq!(order.total_cents, 5000 - 1000 + 500 + 250);
        assert_eq!(order.currency, "EUR");
    }

    #[tokio::test]
    async fn test_create_rejects_discount_above_subtotal() {
        let mut bad = input("ana@shop.test");
        bad.discount_cents = 6000;
        let err = service().create_order(bad).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let service = service();
        let order = service.create_order(input("ana@shop.test")).await.unwrap();

        for status in [
            OrderStatus::Paid,
            OrderStatus::Fulfilled,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Refunded,
        ] {
            let updated = service.transition(order.id, status).await.unwrap();
            assert_eq!(updated.status, status);
        }

        let err = service
            .transition(order.id, OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Refunded,
                to: OrderStatus::Paid
            }
        ));
    }

    #[tokio::test]
    async fn test_skipping_a_step_is_invalid() {
        let service = service();
        let order = service.create_order(input("ana@shop.test")).await.unwrap();
        let err = service
            .transition(order.id, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_delete_only_pending_or_cancelled() {
        let service = service();
        let paid = service.create_order(input("a@shop.test")).await.unwrap();
        service.transition(paid.id, OrderStatus::Paid).await.unwrap();
        assert!(matches!(
            service.delete_order(paid.id).await.unwrap_err(),
            OrderError::NotDeletable(OrderStatus::Paid)
        ));

        let cancelled = service.create_order(input("b@shop.test")).await.unwrap();
        service
            .transition(cancelled.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        service.delete_order(cancelled.id).await.unwrap();
        assert!(matches!(
            service.get_order(cancelled.id).await.unwrap_err(),
            OrderError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_address() {
        let service = service();
        let order = service.create_order(input("a@shop.test")).await.unwrap();
        let address = Address {
            name: "Ana Lima".into(),
            line1: "1 Main St".into(),
            line2: None,
            city: "Lisbon".into(),
            region: None,
            postal_code: "1000-001".into(),
            country: "PT".into(),
        };

        let updated = service
            .update_order(
                order.id,
                UpdateOrder {
                    note: Some(Some("gift wrap".into())),
                    shipping_address: Some(Some(address.clone())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.shipping_address, Some(address));
        assert_eq!(updated.note.as_deref(), Some("gift wrap"));

        let cleared = service
            .update_order(
                order.id,
                UpdateOrder {
                    note: None,
                    shipping_address: Some(None),
                },
            )
            .await
            .unwrap();
        assert!(cleared.shipping_address.is_none());
        assert_eq!(cleared.note.as_deref(), Some("gift wrap"));
    }

    #[tokio::test]
    async fn test_export_lists_orders() {
        let service = service();
        service.create_order(input("a@shop.test")).await.unwrap();
        service.create_order(input("b@shop.test")).await.unwrap();

        let csv = service
            .export_orders(OrderFilter {
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], EXPORT_COLUMNS.join(","));
        assert_eq!(lines.len(), 3);
        assert!(csv.contains("MUG-1 x2|TEE-1 x1"));
        assert!(csv.contains("47.50"));
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let now = chrono::Utc::now();
        let filter = OrderFilter {
            placed_from: Some(now),
            placed_to: Some(now - chrono::Duration::days(1)),
            ..Default::default()
        };
        assert!(matches!(
            service().list_orders(filter).await.unwrap_err(),
            OrderError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_database_error_propagates() {
        let mut repo = MockOrderRepository::new();
        repo.expect_get()
            .returning(|_| Err(OrderError::Database(DbErr::Custom("connection reset".into()))));

        let service = OrderService::new(repo);
        let err = service.get_order(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, OrderError::Database(_)));
    }
}
