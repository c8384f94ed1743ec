//! Ledger service - users and their permissions
//!
//! The service owns no state. Every call validates its input, enforces the
//! ledger invariants and delegates persistence to the injected [`Store`].
//! Billing and payment operations live in the sibling `billing` module.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::application::errors::{ServiceError, StorageError};
use crate::domain::entities::{User, UserKey};
use crate::domain::traits::Store;

/// Service for users, bills and payments
#[derive(Clone)]
pub struct LedgerService {
    pub(super) store: Arc<dyn Store>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a user for a telegram identity
    pub async fn create_user(
        &self,
        telegram_id: i64,
        telegram_name: &str,
        is_owner: bool,
    ) -> Result<User, ServiceError> {
        if telegram_id <= 0 {
            return Err(ServiceError::InvalidArgument(format!(
                "invalid telegram id: {}",
                telegram_id
            )));
        }

        match self.store.get_user(&UserKey::TelegramId(telegram_id)).await {
            Ok(_) => {
                return Err(ServiceError::AlreadyExists {
                    entity: "user",
                    key: telegram_id.to_string(),
                })
            }
            Err(StorageError::NotFound { .. }) => {}
            Err(e) => return Err(ServiceError::Storage(e)),
        }

        let user = User {
            id: Uuid::now_v7(),
            telegram_id,
            telegram_name: telegram_name.trim().to_string(),
            admin: is_owner,
            created_at: Utc::now(),
        };

        match self.store.create_user(&user).await {
            Ok(()) => {}
            // Lost a race against a concurrent registration
            Err(StorageError::Conflict(_)) => {
                return Err(ServiceError::AlreadyExists {
                    entity: "user",
                    key: telegram_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Created user {} (telegram {}, admin {})", user.id, user.telegram_id, user.admin);
        Ok(user)
    }

    pub async fn get_user(&self, key: &UserKey) -> Result<User, ServiceError> {
        Self::check_user_key(key)?;
        Ok(self.store.get_user(key).await?)
    }

    pub async fn delete_user(&self, key: &UserKey) -> Result<(), ServiceError> {
        Self::check_user_key(key)?;
        self.store.delete_user(key).await?;
        tracing::info!("Deleted user {}", key);
        Ok(())
    }

    /// Admin flag of a registered telegram identity
    pub async fn is_admin(&self, telegram_id: i64) -> Result<bool, ServiceError> {
        let user = self.get_user(&UserKey::TelegramId(telegram_id)).await?;
        Ok(user.admin)
    }

    fn check_user_key(key: &UserKey) -> Result<(), ServiceError> {
        if key.is_usable() {
            Ok(())
        } else {
            Err(ServiceError::InvalidArgument(
                "missing identifiers to search user".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::MemoryStore;

    fn service() -> LedgerService {
        LedgerService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_user_sets_identity_and_admin_flag() {
        let service = service();

        let ada = service.create_user(111, "Ada", false).await.unwrap();
        assert!(!ada.id.is_nil());
        assert_eq!(ada.telegram_id, 111);
        assert_eq!(ada.telegram_name, "Ada");
        assert!(!ada.admin);

        let owner = service.create_user(7, "Owner", true).await.unwrap();
        assert!(owner.admin);
        assert_ne!(owner.id, ada.id);
    }

    #[tokio::test]
    async fn create_user_twice_fails() {
        let service = service();
        service.create_user(111, "Ada", false).await.unwrap();

        let err = service.create_user(111, "Ada again", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists { entity: "user", .. }));
    }

    #[tokio::test]
    async fn get_user_by_either_key() {
        let service = service();
        let ada = service.create_user(111, "Ada", false).await.unwrap();

        let by_tg = service.get_user(&UserKey::TelegramId(111)).await.unwrap();
        let by_id = service.get_user(&UserKey::Id(ada.id)).await.unwrap();
        assert_eq!(by_tg, ada);
        assert_eq!(by_id, ada);
    }

    #[tokio::test]
    async fn unusable_keys_are_invalid_arguments() {
        let service = service();

        let err = service.get_user(&UserKey::TelegramId(0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));

        let err = service.delete_user(&UserKey::Id(Uuid::nil())).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let service = service();
        let err = service.get_user(&UserKey::TelegramId(999)).await.unwrap_err();
        assert!(err.is_not_found());

        let err = service.is_admin(999).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_user_removes_it() {
        let service = service();
        service.create_user(111, "Ada", false).await.unwrap();
        service.delete_user(&UserKey::TelegramId(111)).await.unwrap();

        let err = service.get_user(&UserKey::TelegramId(111)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn is_admin_reads_flag() {
        let service = service();
        service.create_user(1, "Owner", true).await.unwrap();
        service.create_user(2, "Guest", false).await.unwrap();

        assert!(service.is_admin(1).await.unwrap());
        assert!(!service.is_admin(2).await.unwrap());
    }
}
