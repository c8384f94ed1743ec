//! Guards run before a command handler and can veto it
//!
//! A guard that rejects is responsible for telling the user why; the router
//! only stops processing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::errors::ServiceError;
use crate::application::services::LedgerService;
use crate::domain::entities::{CommandEvent, UserKey};
use crate::domain::traits::Bot;

/// Per-dispatch context, created fresh for every inbound event
#[derive(Debug, Clone)]
pub struct Context {
    pub dispatch_id: Uuid,
    pub started_at: Instant,
    commands: Arc<[String]>,
    data: HashMap<String, String>,
}

impl Context {
    pub fn new(commands: Arc<[String]>) -> Self {
        Self {
            dispatch_id: Uuid::new_v4(),
            started_at: Instant::now(),
            commands,
            data: HashMap::new(),
        }
    }

    /// Registered command tokens, in registration order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// Set by the admin guards once the requester is known to be an admin
pub const REQUESTER_ADMIN: &str = "requester_admin";

/// Guard trait - accept or reject an event before its handler runs
#[async_trait]
pub trait Guard: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn check(&self, ctx: &mut Context, event: &CommandEvent) -> bool;
}

/// Guard chain builder
pub struct GuardChain {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    pub fn add<G: Guard + 'static>(mut self, guard: G) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn add_shared(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn build(self) -> Vec<Arc<dyn Guard>> {
        self.guards
    }
}

impl Default for GuardChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Reply to the event's message, logging instead of failing on send errors
pub async fn reply(bot: &dyn Bot, event: &CommandEvent, text: &str) {
    if let Err(e) = bot.send_message(event.chat_id, text, Some(event.message_id)).await {
        tracing::error!("error while sending message to chat {}: {}", event.chat_id, e);
    }
}

/// Requester must be a registered user with the admin flag
pub struct RequireAdmin {
    service: LedgerService,
    bot: Arc<dyn Bot>,
}

impl RequireAdmin {
    pub fn new(service: LedgerService, bot: Arc<dyn Bot>) -> Self {
        Self { service, bot }
    }

    async fn check_admin(&self, ctx: &mut Context, event: &CommandEvent) -> bool {
        match self.service.is_admin(event.sender_id).await {
            Ok(true) => {
                ctx.set(REQUESTER_ADMIN, "true");
                true
            }
            Ok(false) | Err(ServiceError::NotFound { .. }) => {
                tracing::warn!(
                    "Permission denied for /{} (telegram {})",
                    event.command,
                    event.sender_id
                );
                reply(self.bot.as_ref(), event, "⚠️ User don't have required permission").await;
                false
            }
            Err(e) => {
                tracing::error!(
                    "error validating user permission (telegram {}): {}",
                    event.sender_id,
                    e
                );
                reply(self.bot.as_ref(), event, "⚠️ Error validating user permission").await;
                false
            }
        }
    }
}

#[async_trait]
impl Guard for RequireAdmin {
    fn name(&self) -> &'static str {
        "require_admin"
    }

    async fn check(&self, ctx: &mut Context, event: &CommandEvent) -> bool {
        self.check_admin(ctx, event).await
    }
}

/// Lets users act on themselves; acting on anyone else needs admin
pub struct RequireAdminOrSelf {
    admin: RequireAdmin,
}

impl RequireAdminOrSelf {
    pub fn new(service: LedgerService, bot: Arc<dyn Bot>) -> Self {
        Self {
            admin: RequireAdmin::new(service, bot),
        }
    }

    /// No argument, or an argument naming the requester by either key
    async fn targets_self(&self, event: &CommandEvent) -> bool {
        if !event.has_args() {
            return true;
        }
        match UserKey::parse(&event.args) {
            Ok(UserKey::TelegramId(tid)) => tid == event.sender_id,
            Ok(UserKey::Id(id)) => {
                let requester = UserKey::TelegramId(event.sender_id);
                match self.admin.service.get_user(&requester).await {
                    Ok(user) => user.id == id,
                    Err(e) => {
                        tracing::debug!("Requester {} not resolved: {}", event.sender_id, e);
                        false
                    }
                }
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Guard for RequireAdminOrSelf {
    fn name(&self) -> &'static str {
        "require_admin_or_self"
    }

    async fn check(&self, ctx: &mut Context, event: &CommandEvent) -> bool {
        if self.targets_self(event).await {
            return true;
        }
        self.admin.check_admin(ctx, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::recording::RecordingBot;
    use crate::infrastructure::storage::MemoryStore;

    async fn setup() -> (LedgerService, Arc<RecordingBot>) {
        let service = LedgerService::new(Arc::new(MemoryStore::new()));
        service.create_user(1, "Owner", true).await.unwrap();
        service.create_user(2, "Guest", false).await.unwrap();
        (service, Arc::new(RecordingBot::new()))
    }

    fn ctx() -> Context {
        Context::new(Arc::from(Vec::<String>::new()))
    }

    #[tokio::test]
    async fn admin_passes_silently() {
        let (service, bot) = setup().await;
        let guard = RequireAdmin::new(service, bot.clone());

        let event = CommandEvent::new("billing_del", "rent").with_sender(1, "Owner");
        let mut ctx = ctx();
        assert!(guard.check(&mut ctx, &event).await);
        assert_eq!(ctx.get(REQUESTER_ADMIN), Some("true"));
        assert!(bot.texts().is_empty());
    }

    #[tokio::test]
    async fn non_admin_and_unknown_users_are_told_why() {
        let (service, bot) = setup().await;
        let guard = RequireAdmin::new(service, bot.clone());

        let guest = CommandEvent::new("billing_del", "rent").with_sender(2, "Guest");
        assert!(!guard.check(&mut ctx(), &guest).await);

        let stranger = CommandEvent::new("billing_del", "rent").with_sender(99, "Nobody");
        assert!(!guard.check(&mut ctx(), &stranger).await);

        let texts = bot.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts.iter().all(|t| t.contains("required permission")));
    }

    #[tokio::test]
    async fn self_targets_skip_the_admin_check() {
        let (service, bot) = setup().await;
        let guard = RequireAdminOrSelf::new(service, bot.clone());

        let no_args = CommandEvent::new("user_del", "").with_sender(2, "Guest");
        let own_id = CommandEvent::new("user_del", "2").with_sender(2, "Guest");
        let other = CommandEvent::new("user_del", "1").with_sender(2, "Guest");
        let by_admin = CommandEvent::new("user_del", "2").with_sender(1, "Owner");

        assert!(guard.check(&mut ctx(), &no_args).await);
        assert!(guard.check(&mut ctx(), &own_id).await);
        assert!(!guard.check(&mut ctx(), &other).await);
        assert!(guard.check(&mut ctx(), &by_admin).await);
        assert_eq!(bot.texts().len(), 1);
    }

    #[tokio::test]
    async fn own_uuid_counts_as_self() {
        let (service, bot) = setup().await;
        let guest = service.get_user(&UserKey::TelegramId(2)).await.unwrap();
        let owner = service.get_user(&UserKey::TelegramId(1)).await.unwrap();
        let guard = RequireAdminOrSelf::new(service, bot.clone());

        let own_uuid = CommandEvent::new("user_del", guest.id.to_string()).with_sender(2, "Guest");
        let owner_uuid = CommandEvent::new("user_del", owner.id.to_string()).with_sender(2, "Guest");

        assert!(guard.check(&mut ctx(), &own_uuid).await);
        assert!(bot.texts().is_empty());

        assert!(!guard.check(&mut ctx(), &owner_uuid).await);
        assert_eq!(bot.texts().len(), 1);
    }

    #[test]
    fn chain_keeps_order() {
        struct Named(&'static str);

        #[async_trait]
        impl Guard for Named {
            fn name(&self) -> &'static str {
                self.0
            }

            async fn check(&self, _ctx: &mut Context, _event: &CommandEvent) -> bool {
                true
            }
        }

        let chain = GuardChain::new().add(Named("first")).add(Named("second")).build();
        let names: Vec<_> = chain.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
