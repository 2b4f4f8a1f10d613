use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CustomerError, CustomerResult};
use crate::models::{ContactFilter, ContactMessage, ContactStatus, Customer, CustomerFilter};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Insert a customer; the email must be free
    async fn create(&self, customer: Customer) -> CustomerResult<Customer>;

    async fn get(&self, id: Uuid) -> CustomerResult<Option<Customer>>;

    /// `email` must already be lowercased
    async fn get_by_email(&self, email: &str) -> CustomerResult<Option<Customer>>;

    /// Newest first
    async fn list(&self, filter: CustomerFilter) -> CustomerResult<Vec<Customer>>;

    async fn update(&self, customer: Customer) -> CustomerResult<Customer>;

    async fn delete(&self, id: Uuid) -> CustomerResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, message: ContactMessage) -> CustomerResult<ContactMessage>;

    async fn get(&self, id: Uuid) -> CustomerResult<Option<ContactMessage>>;

    /// Newest first
    async fn list(&self, filter: ContactFilter) -> CustomerResult<Vec<ContactMessage>>;

    async fn set_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> CustomerResult<Option<ContactMessage>>;

    async fn delete(&self, id: Uuid) -> CustomerResult<bool>;

    async fn count_with_status(&self, status: ContactStatus) -> CustomerResult<u64>;
}

#[derive(Clone, Default)]
pub struct InMemoryCustomers {
    customers: Arc<RwLock<HashMap<Uuid, Customer>>>,
}

impl InMemoryCustomers {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomers {
    async fn create(&self, customer: Customer) -> CustomerResult<Customer> {
        let mut customers = self.customers.write().await;

        if customers.values().any(|c| c.email == customer.email) {
            return Err(CustomerError::DuplicateEmail(customer.email));
        }

        customers.insert(customer.id, customer.clone());
        tracing::info!(customer_id = %customer.id, "Created customer");
        Ok(customer)
    }

    async fn get(&self, id: Uuid) -> CustomerResult<Option<Customer>> {
        Ok(self.customers.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> CustomerResult<Option<Customer>> {
        Ok(self
            .customers
            .read()
            .await
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn list(&self, filter: CustomerFilter) -> CustomerResult<Vec<Customer>> {
        let customers = self.customers.read().await;

        let mut result: Vec<Customer> = customers
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update(&self, customer: Customer) -> CustomerResult<Customer> {
        let mut customers = self.customers.write().await;

        if !customers.contains_key(&customer.id) {
            return Err(CustomerError::NotFound(customer.id));
        }
        if customers
            .values()
            .any(|c| c.email == customer.email && c.id != customer.id)
        {
            return Err(CustomerError::DuplicateEmail(customer.email));
        }

        customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn delete(&self, id: Uuid) -> CustomerResult<bool> {
        Ok(self.customers.write().await.remove(&id).is_some())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryContactMessages {
    messages: Arc<RwLock<HashMap<Uuid, ContactMessage>>>,
}

impl InMemoryContactMessages {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactMessages {
    async fn create(&self, message: ContactMessage) -> CustomerResult<ContactMessage> {
        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn get(&self, id: Uuid) -> CustomerResult<Option<ContactMessage>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: ContactFilter) -> CustomerResult<Vec<ContactMessage>> {
        let messages = self.messages.read().await;

        let mut result: Vec<ContactMessage> = messages
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> CustomerResult<Option<ContactMessage>> {
        let mut messages = self.messages.write().await;
        Ok(messages.get_mut(&id).map(|m| {
            m.status = status;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> CustomerResult<bool> {
        Ok(self.messages.write().await.remove(&id).is_some())
    }

    async fn count_with_status(&self, status: ContactStatus) -> CustomerResult<u64> {
        Ok(self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.status == status)
            .count() as u64)
    }
}
