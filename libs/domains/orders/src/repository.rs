use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};
use crate::models::{Order, OrderFilter, OrderStatus};

/// First display number handed out by [`InMemoryOrders`]
pub const FIRST_ORDER_NUMBER: u64 = 1001;

pub fn format_order_number(n: u64) -> String {
    format!("#{:06}", n)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert an order; the store assigns `number`
    async fn create(&self, order: Order) -> OrderResult<Order>;

    async fn get(&self, id: Uuid) -> OrderResult<Option<Order>>;

    /// Newest first
    async fn list(&self, filter: OrderFilter) -> OrderResult<Vec<Order>>;

    async fn update(&self, order: Order) -> OrderResult<Order>;

    /// Move `id` from `from` to `to` only if it is still in `from`.
    /// `None` when the order is missing or its status changed meanwhile.
    async fn set_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> OrderResult<Option<Order>>;

    async fn delete(&self, id: Uuid) -> OrderResult<bool>;
}

#[derive(Default)]
struct OrderState {
    orders: HashMap<Uuid, Order>,
    next_number: u64,
}

#[derive(Clone)]
pub struct InMemoryOrders {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrders {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(OrderState {
                orders: HashMap::new(),
                next_number: FIRST_ORDER_NUMBER,
            })),
        }
    }
}

impl Default for InMemoryOrders {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn create(&self, mut order: Order) -> OrderResult<Order> {
        let mut state = self.state.write().await;

        order.number = format_order_number(state.next_number);
        state.next_number += 1;
        state.orders.insert(order.id, order.clone());

        tracing::info!(order_id = %order.id, number = %order.number, "Created order");
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> OrderResult<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list(&self, filter: OrderFilter) -> OrderResult<Vec<Order>> {
        let state = self.state.read().await;

        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));

        Ok(orders
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update(&self, order: Order) -> OrderResult<Order> {
        let mut state = self.state.write().await;

        match state.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(order)
            }
            None => Err(OrderError::NotFound(order.id)),
        }
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> OrderResult<Option<Order>> {
        let mut state = self.state.write().await;

        Ok(state
            .orders
            .get_mut(&id)
            .filter(|o| o.status == from)
            .map(|o| {
                o.status = to;
                o.updated_at = chrono::Utc::now();
                o.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> OrderResult<bool> {
        Ok(self.state.write().await.orders.remove(&id).is_some())
    }
}
