use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CustomerError, CustomerResult};
use crate::models::{
    ContactFilter, ContactMessage, ContactStatus, CreateCustomer, Customer, CustomerFilter,
    MAX_PAGE_SIZE, SubmitContact, UnreadCount, UpdateCustomer, normalise_email,
};
use crate::repository::{ContactRepository, CustomerRepository};

pub struct CustomerService<R: CustomerRepository> {
    pub(crate) repository: Arc<R>,
}

impl<R: CustomerRepository> Clone for CustomerService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: CustomerRepository> CustomerService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    pub async fn create_customer(&self, input: CreateCustomer) -> CustomerResult<Customer> {
        input
            .validate()
            .map_err(|e| CustomerError::Validation(e.to_string()))?;
        self.repository.create(Customer::new(input)).await
    }

    pub async fn get_customer(&self, id: Uuid) -> CustomerResult<Customer> {
        self.repository
            .get(id)
            .await?
            .ok_or(CustomerError::NotFound(id))
    }

    pub async fn find_by_email(&self, email: &str) -> CustomerResult<Option<Customer>> {
        self.repository.get_by_email(&normalise_email(email)).await
    }

    pub async fn list_customers(&self, mut filter: CustomerFilter) -> CustomerResult<Vec<Customer>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list(filter).await
    }

    pub async fn update_customer(
        &self,
        id: Uuid,
        input: UpdateCustomer,
    ) -> CustomerResult<Customer> {
        input
            .validate()
            .map_err(|e| CustomerError::Validation(e.to_string()))?;

        let mut customer = self.get_customer(id).await?;
        customer.apply_update(input);
        self.repository.update(customer).await
    }

    pub async fn delete_customer(&self, id: Uuid) -> CustomerResult<()> {
        if !self.repository.delete(id).await? {
            return Err(CustomerError::NotFound(id));
        }
        Ok(())
    }
}

pub struct ContactService<R: ContactRepository> {
    repository: Arc<R>,
}

impl<R: ContactRepository> Clone for ContactService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ContactRepository> ContactService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Storefront form submission; always lands in `new`
    pub async fn submit(&self, input: SubmitContact) -> CustomerResult<ContactMessage> {
        input
            .validate()
            .map_err(|e| CustomerError::Validation(e.to_string()))?;

        let message = self.repository.create(ContactMessage::new(input)).await?;
        tracing::info!(message_id = %message.id, "Contact message received");
        Ok(message)
    }

    pub async fn get_message(&self, id: Uuid) -> CustomerResult<ContactMessage> {
        self.repository
            .get(id)
            .await?
            .ok_or(CustomerError::MessageNotFound(id))
    }

    pub async fn list_messages(
        &self,
        mut filter: ContactFilter,
    ) -> CustomerResult<Vec<ContactMessage>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list(filter).await
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> CustomerResult<ContactMessage> {
        self.repository
            .set_status(id, status)
            .await?
            .ok_or(CustomerError::MessageNotFound(id))
    }

    pub async fn delete_message(&self, id: Uuid) -> CustomerResult<()> {
        if !self.repository.delete(id).await? {
            return Err(CustomerError::MessageNotFound(id));
        }
        Ok(())
    }

    pub async fn unread_count(&self) -> CustomerResult<UnreadCount> {
        let unread = self.repository.count_with_status(ContactStatus::New).await?;
        Ok(UnreadCount { unread })
    }
}
