//! In-memory storage implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::errors::StorageError;
use crate::domain::entities::{Billing, BillingKey, Payment, User, UserKey};
use crate::domain::traits::Store;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    billings: HashMap<Uuid, Billing>,
    /// Kept in association order
    payments: Vec<Payment>,
}

impl Tables {
    fn find_user(&self, key: &UserKey) -> Option<&User> {
        match key {
            UserKey::Id(id) => self.users.get(id),
            UserKey::TelegramId(tid) => self.users.values().find(|u| u.telegram_id == *tid),
        }
    }

    fn find_billing(&self, key: &BillingKey) -> Option<&Billing> {
        match key {
            BillingKey::Id(id) => self.billings.get(id),
            BillingKey::Name(name) => self.billings.values().find(|b| &b.name == name),
        }
    }

    fn payment_index(&self, billing_id: Uuid, user_id: Uuid) -> Option<usize> {
        self.payments
            .iter()
            .position(|p| p.billing_id == billing_id && p.user_id == user_id)
    }
}

/// Process-local store, for development and tests. Deletes cascade to
/// payment rows the same way the SQLite schema does.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id)
            || tables.find_user(&UserKey::TelegramId(user.telegram_id)).is_some()
        {
            return Err(StorageError::Conflict(format!("user {} exists", user.telegram_id)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, key: &UserKey) -> Result<User, StorageError> {
        let tables = self.tables.read().await;
        tables
            .find_user(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", key))
    }

    async fn delete_user(&self, key: &UserKey) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .find_user(key)
            .map(|u| u.id)
            .ok_or_else(|| StorageError::not_found("user", key))?;
        tables.users.remove(&id);
        tables.payments.retain(|p| p.user_id != id);
        Ok(())
    }

    async fn create_billing(&self, billing: &Billing) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if tables.billings.contains_key(&billing.id)
            || tables.find_billing(&BillingKey::Name(billing.name.clone())).is_some()
        {
            return Err(StorageError::Conflict(format!("billing {} exists", billing.name)));
        }
        let mut row = billing.clone();
        row.payments.clear();
        row.value_per_user = None;
        tables.billings.insert(row.id, row);
        Ok(())
    }

    async fn get_billing(&self, key: &BillingKey) -> Result<Billing, StorageError> {
        let tables = self.tables.read().await;
        let mut billing = tables
            .find_billing(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found("billing", key))?;

        billing.payments = tables
            .payments
            .iter()
            .filter(|p| p.billing_id == billing.id)
            .map(|p| Payment {
                user: tables.users.get(&p.user_id).cloned(),
                ..p.clone()
            })
            .collect();
        Ok(billing)
    }

    async fn list_billings(&self) -> Result<Vec<Billing>, StorageError> {
        let tables = self.tables.read().await;
        let mut billings: Vec<Billing> = tables.billings.values().cloned().collect();
        billings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(billings)
    }

    async fn delete_billing(&self, key: &BillingKey) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .find_billing(key)
            .map(|b| b.id)
            .ok_or_else(|| StorageError::not_found("billing", key))?;
        tables.billings.remove(&id);
        tables.payments.retain(|p| p.billing_id != id);
        Ok(())
    }

    async fn associate_payment(&self, payment: &Payment) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.billings.contains_key(&payment.billing_id) {
            return Err(StorageError::not_found("billing", payment.billing_id));
        }
        if !tables.users.contains_key(&payment.user_id) {
            return Err(StorageError::not_found("user", payment.user_id));
        }
        if tables.payment_index(payment.billing_id, payment.user_id).is_some() {
            return Err(StorageError::Conflict(format!(
                "user {} already associated to billing {}",
                payment.user_id, payment.billing_id
            )));
        }
        tables.payments.push(Payment {
            user: None,
            ..payment.clone()
        });
        Ok(())
    }

    async fn disassociate_payment(&self, billing_id: Uuid, user_id: Uuid) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let index = tables
            .payment_index(billing_id, user_id)
            .ok_or_else(|| StorageError::not_found("payment", format!("{}/{}", billing_id, user_id)))?;
        tables.payments.remove(index);
        Ok(())
    }

    async fn change_payment_status(&self, payment: &Payment) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let index = tables
            .payment_index(payment.billing_id, payment.user_id)
            .ok_or_else(|| {
                StorageError::not_found("payment", format!("{}/{}", payment.billing_id, payment.user_id))
            })?;
        let row = &mut tables.payments[index];
        row.paid = payment.paid;
        row.paid_at = payment.paid_at;
        Ok(())
    }

    async fn get_payment_association(&self, billing_id: Uuid, user_id: Uuid) -> Result<Payment, StorageError> {
        let tables = self.tables.read().await;
        tables
            .payment_index(billing_id, user_id)
            .map(|i| tables.payments[i].clone())
            .ok_or_else(|| StorageError::not_found("payment", format!("{}/{}", billing_id, user_id)))
    }
}
