use crate::application::messaging::split_args;
use crate::domain::entities::{Billing, BillingKey, CommandEvent, Payment, User, UserKey};

use super::{render, Commands};

const PAIR_ARGS: &str = "<billing-identifier> <user-identifier>";

impl Commands {
    async fn parse_billing_key(&self, event: &CommandEvent, raw: &str) -> Option<BillingKey> {
        match BillingKey::parse(raw) {
            Ok(key) => Some(key),
            Err(e) => {
                self.send(event, &format!("⚠️ Error to get billing: {}", e)).await;
                None
            }
        }
    }

    async fn parse_user_key(&self, event: &CommandEvent, raw: &str) -> Option<UserKey> {
        match UserKey::parse(raw) {
            Ok(key) => Some(key),
            Err(_) => {
                self.send(
                    event,
                    &format!("⚠️ Error to get user, invalid id informed: {}", render::escape(raw)),
                )
                .await;
                None
            }
        }
    }

    /// `<billing> <user>` argument pair
    async fn parse_pair(&self, event: &CommandEvent) -> Option<(BillingKey, UserKey)> {
        let fields = match split_args(&event.args, 2) {
            Ok(fields) => fields,
            Err(received) => {
                tracing::info!("/{} got {} arguments, expected 2", event.command, received);
                self.send(event, &render::invalid_arguments(PAIR_ARGS)).await;
                return None;
            }
        };

        let billing = self.parse_billing_key(event, fields[0]).await?;
        let user = self.parse_user_key(event, fields[1]).await?;
        Some((billing, user))
    }

    /// Resolve both sides of a payment, replying on failure
    async fn resolve_pair(
        &self,
        event: &CommandEvent,
        billing: &BillingKey,
        user: &UserKey,
    ) -> Option<(Billing, User)> {
        let billing = match self.service.get_billing(billing).await {
            Ok(billing) => billing,
            Err(e) => {
                self.fail(event, "getting billing", e).await;
                return None;
            }
        };

        let user = match self.service.get_user(user).await {
            Ok(user) => user,
            Err(e) => {
                self.fail(event, "getting user", e).await;
                return None;
            }
        };

        Some((billing, user))
    }

    pub(super) async fn get_billing(&self, event: &CommandEvent) {
        let Some(key) = self.parse_billing_key(event, &event.args).await else {
            return;
        };

        match self.service.get_billing(&key).await {
            Ok(billing) => self.send(event, &render::billing_details(&billing)).await,
            Err(e) => self.fail(event, "getting billing", e).await,
        }
    }

    pub(super) async fn list_billings(&self, event: &CommandEvent) {
        match self.service.list_billings().await {
            Ok(billings) => self.send(event, &render::billing_list(&billings)).await,
            Err(e) => self.fail(event, "getting billings", e).await,
        }
    }

    pub(super) async fn create_billing(&self, event: &CommandEvent) {
        let fields = match split_args(&event.args, 2) {
            Ok(fields) => fields,
            Err(received) => {
                tracing::info!("/{} got {} arguments, expected 2", event.command, received);
                self.send(event, &render::invalid_arguments("<name> <value>")).await;
                return;
            }
        };

        let (name, raw_value) = (fields[0], fields[1]);
        let value = match raw_value.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                self.send(
                    event,
                    &format!(
                        "⚠️ Invalid value for billing, expected float, received: {}",
                        render::escape(raw_value)
                    ),
                )
                .await;
                return;
            }
        };

        match self.service.create_billing(name, value).await {
            Ok(billing) => self.send(event, &render::billing_created(&billing)).await,
            Err(e) => self.fail(event, "creating billing", e).await,
        }
    }

    pub(super) async fn delete_billing(&self, event: &CommandEvent) {
        let Some(key) = self.parse_billing_key(event, &event.args).await else {
            return;
        };

        match self.service.delete_billing(&key).await {
            Ok(()) => self.send(event, &render::billing_deleted(&key.to_string())).await,
            Err(e) => self.fail(event, "deleting billing", e).await,
        }
    }

    pub(super) async fn change_association(&self, event: &CommandEvent, associate: bool) {
        let Some((billing_key, user_key)) = self.parse_pair(event).await else {
            return;
        };
        let Some((billing, user)) = self.resolve_pair(event, &billing_key, &user_key).await else {
            return;
        };

        match self
            .service
            .change_payment_association(billing.id, user.id, associate)
            .await
        {
            Ok(()) => {
                let payment = Payment::new(billing.id, user.id);
                self.send(event, &render::association(&payment, associate)).await
            }
            Err(e) => self.fail(event, "changing payment association", e).await,
        }
    }

    /// `billing_pay` / `billing_unpay`: the requester's own share
    pub(super) async fn change_own_payment(&self, event: &CommandEvent, paid: bool) {
        let Some(billing_key) = self.parse_billing_key(event, &event.args).await else {
            return;
        };
        let user_key = UserKey::TelegramId(event.sender_id);
        self.set_payment_status(event, &billing_key, &user_key, paid).await;
    }

    /// Admin variants, naming both the bill and the participant
    pub(super) async fn change_payment(&self, event: &CommandEvent, paid: bool) {
        let Some((billing_key, user_key)) = self.parse_pair(event).await else {
            return;
        };
        self.set_payment_status(event, &billing_key, &user_key, paid).await;
    }

    async fn set_payment_status(
        &self,
        event: &CommandEvent,
        billing_key: &BillingKey,
        user_key: &UserKey,
        paid: bool,
    ) {
        let Some((billing, user)) = self.resolve_pair(event, billing_key, user_key).await else {
            return;
        };

        match self.service.change_payment_status(billing.id, user.id, paid).await {
            Ok(payment) => self.send(event, &render::payment_status(&payment)).await,
            Err(e) => self.fail(event, "changing payment status", e).await,
        }
    }
}
