//! Billing and payment operations of the ledger service

use chrono::Utc;
use uuid::Uuid;

use super::LedgerService;
use crate::application::errors::{ServiceError, StorageError};
use crate::domain::entities::{Billing, BillingKey, Payment};

impl LedgerService {
    /// Create a bill. The name doubles as a lookup key, so it must be a
    /// single non-empty word that does not read as a bill id.
    pub async fn create_billing(&self, name: &str, value: f64) -> Result<Billing, ServiceError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ServiceError::InvalidArgument(format!(
                "invalid name informed: {}",
                name
            )));
        }
        if Uuid::parse_str(name).is_ok() {
            return Err(ServiceError::InvalidArgument(format!(
                "name must not be an id: {}",
                name
            )));
        }
        if !value.is_finite() || value <= 0.0 {
            return Err(ServiceError::InvalidArgument(format!(
                "invalid value informed: {}",
                value
            )));
        }

        let key = BillingKey::Name(name.to_string());
        match self.store.get_billing(&key).await {
            Ok(_) => {
                return Err(ServiceError::AlreadyExists {
                    entity: "billing",
                    key: name.to_string(),
                })
            }
            Err(StorageError::NotFound { .. }) => {}
            Err(e) => return Err(ServiceError::Storage(e)),
        }

        let billing = Billing {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            ..Billing::new(name, value)
        };

        match self.store.create_billing(&billing).await {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => {
                return Err(ServiceError::AlreadyExists {
                    entity: "billing",
                    key: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Created billing {} ({}) value {}", billing.name, billing.id, billing.value);
        Ok(billing)
    }

    /// Bill with its participants and the derived value per participant
    pub async fn get_billing(&self, key: &BillingKey) -> Result<Billing, ServiceError> {
        Self::check_billing_key(key)?;

        let mut billing = self.store.get_billing(key).await?;
        billing.compute_value_per_user();
        Ok(billing)
    }

    /// Summary view: no participants, no derived value
    pub async fn list_billings(&self) -> Result<Vec<Billing>, ServiceError> {
        Ok(self.store.list_billings().await?)
    }

    pub async fn delete_billing(&self, key: &BillingKey) -> Result<(), ServiceError> {
        Self::check_billing_key(key)?;
        self.store.delete_billing(key).await?;
        tracing::info!("Deleted billing {}", key);
        Ok(())
    }

    /// Add (`associate = true`) or remove a participant from a bill
    pub async fn change_payment_association(
        &self,
        billing_id: Uuid,
        user_id: Uuid,
        associate: bool,
    ) -> Result<(), ServiceError> {
        Self::check_payment_ids(billing_id, user_id)?;

        if associate {
            let payment = Payment::new(billing_id, user_id);
            self.store.associate_payment(&payment).await?;
        } else {
            self.store.disassociate_payment(billing_id, user_id).await?;
        }

        tracing::info!(
            "Payment association changed: billing {} user {} associate {}",
            billing_id,
            user_id,
            associate
        );
        Ok(())
    }

    /// Existence check, a missing association is `false` rather than an error
    pub async fn payment_association_exists(
        &self,
        billing_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ServiceError> {
        match self.store.get_payment_association(billing_id, user_id).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(ServiceError::Storage(e)),
        }
    }

    /// Mark a participant's share as paid or unpaid.
    ///
    /// Fails with `NotFound` unless the pair is associated. Moving to paid
    /// stamps `paid_at`; moving back to unpaid keeps the last stamp.
    pub async fn change_payment_status(
        &self,
        billing_id: Uuid,
        user_id: Uuid,
        paid: bool,
    ) -> Result<Payment, ServiceError> {
        Self::check_payment_ids(billing_id, user_id)?;

        let mut payment = self
            .store
            .get_payment_association(billing_id, user_id)
            .await?;

        payment.paid = paid;
        if paid {
            payment.paid_at = Some(Utc::now());
        }

        self.store.change_payment_status(&payment).await?;

        tracing::info!("Payment status changed: billing {} user {} paid {}", billing_id, user_id, paid);
        Ok(payment)
    }

    fn check_billing_key(key: &BillingKey) -> Result<(), ServiceError> {
        if key.is_usable() {
            Ok(())
        } else {
            Err(ServiceError::InvalidArgument("missing billing identifier".to_string()))
        }
    }

    fn check_payment_ids(billing_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        if billing_id.is_nil() || user_id.is_nil() {
            return Err(ServiceError::InvalidArgument(
                "missing billing or user identifier".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::entities::UserKey;
    use crate::infrastructure::storage::MemoryStore;

    fn service() -> LedgerService {
        LedgerService::new(Arc::new(MemoryStore::new()))
    }

    fn name_key(name: &str) -> BillingKey {
        BillingKey::Name(name.to_string())
    }

    #[tokio::test]
    async fn create_then_get_by_name() {
        let service = service();
        let created = service.create_billing("rent", 120.0).await.unwrap();

        let found = service.get_billing(&name_key("rent")).await.unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "rent");
        assert_eq!(found.value, 120.0);
        assert_eq!(found.participants(), 0);
        assert_eq!(found.value_per_user, None);

        let by_id = service.get_billing(&BillingKey::Id(created.id)).await.unwrap();
        assert_eq!(by_id.name, "rent");
    }

    #[tokio::test]
    async fn create_rejects_bad_names_and_values() {
        let service = service();

        for name in ["", "two words", "tab\tname"] {
            let err = service.create_billing(name, 10.0).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidArgument(_)), "{:?}", name);
        }
        for value in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = service.create_billing("rent", value).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidArgument(_)), "{}", value);
        }
    }

    #[tokio::test]
    async fn id_shaped_names_are_rejected() {
        let service = service();
        let name = "0190f1a2-7c3b-7def-8a12-3456789abcde";

        let err = service.create_billing(name, 10.0).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert!(matches!(BillingKey::parse(name), Ok(BillingKey::Id(_))));
        assert!(service.list_billings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_duplicate_name_fails() {
        let service = service();
        service.create_billing("rent", 120.0).await.unwrap();

        let err = service.create_billing("rent", 50.0).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists { entity: "billing", .. }));
    }

    #[tokio::test]
    async fn get_with_unusable_key_is_invalid() {
        let service = service();
        let err = service.get_billing(&name_key("")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));

        let err = service.delete_billing(&BillingKey::Id(Uuid::nil())).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn value_per_user_follows_participants() {
        let service = service();
        let bill = service.create_billing("dinner", 90.0).await.unwrap();
        let mut users = Vec::new();
        for tid in 1..=3 {
            users.push(service.create_user(tid, "u", false).await.unwrap());
        }

        for user in &users {
            service.change_payment_association(bill.id, user.id, true).await.unwrap();
        }
        let found = service.get_billing(&name_key("dinner")).await.unwrap();
        assert_eq!(found.participants(), 3);
        assert!((found.value_per_user.unwrap() - 30.0).abs() < f64::EPSILON);

        service.change_payment_association(bill.id, users[0].id, false).await.unwrap();
        let found = service.get_billing(&name_key("dinner")).await.unwrap();
        assert!((found.value_per_user.unwrap() - 45.0).abs() < f64::EPSILON);

        let listed = service.list_billings().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].value_per_user, None);
        assert!(listed[0].payments.is_empty());
    }

    #[tokio::test]
    async fn association_conflicts_and_missing_rows() {
        let service = service();
        let bill = service.create_billing("rent", 120.0).await.unwrap();
        let user = service.create_user(111, "Ada", false).await.unwrap();

        service.change_payment_association(bill.id, user.id, true).await.unwrap();
        let err = service.change_payment_association(bill.id, user.id, true).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        service.change_payment_association(bill.id, user.id, false).await.unwrap();
        let err = service.change_payment_association(bill.id, user.id, false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn association_check_absorbs_not_found() {
        let service = service();
        let bill = service.create_billing("rent", 120.0).await.unwrap();
        let user = service.create_user(111, "Ada", false).await.unwrap();

        assert!(!service.payment_association_exists(bill.id, user.id).await.unwrap());
        service.change_payment_association(bill.id, user.id, true).await.unwrap();
        assert!(service.payment_association_exists(bill.id, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn pay_and_unpay_keep_last_paid_at() {
        let service = service();
        let bill = service.create_billing("rent", 120.0).await.unwrap();
        let user = service.create_user(111, "Ada", false).await.unwrap();
        service.change_payment_association(bill.id, user.id, true).await.unwrap();
        let associated_at = Utc::now();

        let paid = service.change_payment_status(bill.id, user.id, true).await.unwrap();
        assert!(paid.paid);
        let paid_at = paid.paid_at.unwrap();
        assert!(paid_at >= associated_at);

        let unpaid = service.change_payment_status(bill.id, user.id, false).await.unwrap();
        assert!(!unpaid.paid);
        assert_eq!(unpaid.paid_at, Some(paid_at));

        let found = service.get_billing(&BillingKey::Id(bill.id)).await.unwrap();
        assert_eq!(found.payments[0].paid_at, Some(paid_at));
        assert!(!found.payments[0].paid);
    }

    #[tokio::test]
    async fn status_change_requires_association() {
        let service = service();
        let bill = service.create_billing("rent", 120.0).await.unwrap();
        let user = service.create_user(111, "Ada", false).await.unwrap();

        let err = service.change_payment_status(bill.id, user.id, true).await.unwrap_err();
        assert!(err.is_not_found());

        let err = service.change_payment_status(Uuid::nil(), user.id, true).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn deleting_a_bill_drops_its_payments() {
        let service = service();
        let bill = service.create_billing("rent", 120.0).await.unwrap();
        let user = service.create_user(111, "Ada", false).await.unwrap();
        service.change_payment_association(bill.id, user.id, true).await.unwrap();

        service.delete_billing(&name_key("rent")).await.unwrap();
        assert!(service.get_billing(&name_key("rent")).await.unwrap_err().is_not_found());
        assert!(!service.payment_association_exists(bill.id, user.id).await.unwrap());
        assert!(service.get_user(&UserKey::TelegramId(111)).await.is_ok());
    }

    #[tokio::test]
    async fn ada_pays_rent() {
        let service = service();
        let ada = service.create_user(111, "Ada", false).await.unwrap();
        assert!(!ada.admin);

        service.create_billing("rent", 120.0).await.unwrap();
        let rent = service.get_billing(&name_key("rent")).await.unwrap();
        assert_eq!(rent.participants(), 0);
        assert_eq!(rent.value_per_user, None);

        service.change_payment_association(rent.id, ada.id, true).await.unwrap();
        let rent = service.get_billing(&name_key("rent")).await.unwrap();
        assert_eq!(rent.participants(), 1);
        assert_eq!(rent.value_per_user, Some(120.0));

        let payment = service.change_payment_status(rent.id, ada.id, true).await.unwrap();
        assert!(payment.paid);
        assert!(payment.paid_at.is_some());
    }
}
