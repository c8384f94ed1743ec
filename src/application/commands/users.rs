use crate::application::messaging::{Context, REQUESTER_ADMIN};
use crate::domain::entities::{CommandEvent, UserKey};

use super::{render, Commands};

impl Commands {
    /// Lookup key from the arguments, the requester when there are none
    async fn user_key_or_self(&self, event: &CommandEvent) -> Option<UserKey> {
        if !event.has_args() {
            return Some(UserKey::TelegramId(event.sender_id));
        }
        match UserKey::parse(&event.args) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::info!("Invalid user identifier {:?}: {}", event.args, e);
                self.send(
                    event,
                    &format!("⚠️ Error to get user, invalid id informed: {}", render::escape(&event.args)),
                )
                .await;
                None
            }
        }
    }

    pub(super) async fn get_user(&self, event: &CommandEvent) {
        let Some(key) = self.user_key_or_self(event).await else {
            return;
        };

        match self.service.get_user(&key).await {
            Ok(user) => self.send(event, &render::user_details(&user)).await,
            Err(e) => self.fail(event, "getting user", e).await,
        }
    }

    pub(super) async fn create_user(&self, event: &CommandEvent) {
        let is_owner = self.owner_id == Some(event.sender_id);

        match self
            .service
            .create_user(event.sender_id, &event.sender_name, is_owner)
            .await
        {
            Ok(user) => self.send(event, &render::user_created(&user)).await,
            Err(e) => self.fail(event, "creating user", e).await,
        }
    }

    pub(super) async fn delete_user(&self, ctx: &Context, event: &CommandEvent) {
        let Some(key) = self.user_key_or_self(event).await else {
            return;
        };

        match self.service.delete_user(&key).await {
            Ok(()) => {
                if ctx.get(REQUESTER_ADMIN).is_some() {
                    tracing::info!("User {} deleted by admin {} ({})", key, event.sender_id, ctx.dispatch_id);
                }
                self.send(event, &render::user_deleted(&key.to_string())).await
            }
            Err(e) => self.fail(event, "deleting user", e).await,
        }
    }
}
