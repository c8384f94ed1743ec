use async_trait::async_trait;
use uuid::Uuid;

use crate::application::errors::StorageError;
use crate::domain::entities::{Billing, BillingKey, Payment, User, UserKey};

/// Store trait - abstraction for the identity and billing persistence
///
/// Lookups use exactly the column selected by the key variant. Missing rows
/// are reported as `StorageError::NotFound`, never as a generic failure.
#[async_trait]
pub trait Store: Send + Sync {
    // User operations
    async fn create_user(&self, user: &User) -> Result<(), StorageError>;
    async fn get_user(&self, key: &UserKey) -> Result<User, StorageError>;
    async fn delete_user(&self, key: &UserKey) -> Result<(), StorageError>;

    // Billing operations
    async fn create_billing(&self, billing: &Billing) -> Result<(), StorageError>;
    /// Returns the bill with all its payment rows and their users
    async fn get_billing(&self, key: &BillingKey) -> Result<Billing, StorageError>;
    /// Summary rows only, payments are not loaded
    async fn list_billings(&self) -> Result<Vec<Billing>, StorageError>;
    /// Payment rows of the bill are removed with it
    async fn delete_billing(&self, key: &BillingKey) -> Result<(), StorageError>;

    // Payment operations
    /// Fails with `Conflict` when the pair is already associated
    async fn associate_payment(&self, payment: &Payment) -> Result<(), StorageError>;
    async fn disassociate_payment(&self, billing_id: Uuid, user_id: Uuid) -> Result<(), StorageError>;
    async fn change_payment_status(&self, payment: &Payment) -> Result<(), StorageError>;
    async fn get_payment_association(&self, billing_id: Uuid, user_id: Uuid) -> Result<Payment, StorageError>;
}
