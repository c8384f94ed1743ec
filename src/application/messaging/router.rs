//! Command router - Routes command events through guards to handlers

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::CommandEvent;
use super::middleware::{Context, Guard};

/// Handler trait - runs once per accepted event
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &Context, event: &CommandEvent);
}

/// What happened to a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No binding for the token, event dropped
    Unknown,
    /// A guard said no; carries the guard's name
    Rejected(&'static str),
    Handled,
}

struct Binding {
    handler: Arc<dyn Handler>,
    guards: Vec<Arc<dyn Guard>>,
}

/// Collects bindings before the router is frozen
#[derive(Default)]
pub struct RouterBuilder {
    bindings: HashMap<String, Binding>,
    order: Vec<String>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a token to a handler and its guards.
    ///
    /// Registering the same token again replaces the earlier binding but keeps
    /// its first position in the command list.
    pub fn register<H: Handler + 'static>(
        &mut self,
        token: impl Into<String>,
        handler: H,
        guards: Vec<Arc<dyn Guard>>,
    ) -> &mut Self {
        self.register_shared(token, Arc::new(handler), guards)
    }

    pub fn register_shared(
        &mut self,
        token: impl Into<String>,
        handler: Arc<dyn Handler>,
        guards: Vec<Arc<dyn Guard>>,
    ) -> &mut Self {
        let token = token.into();
        let binding = Binding { handler, guards };
        if self.bindings.insert(token.clone(), binding).is_some() {
            tracing::debug!("Replacing handler for /{}", token);
        } else {
            self.order.push(token);
        }
        self
    }

    pub fn build(self) -> Router {
        tracing::info!("Router built with {} commands", self.order.len());
        Router {
            inner: Arc::new(RouterInner {
                bindings: self.bindings,
                commands: self.order.into(),
            }),
        }
    }
}

struct RouterInner {
    bindings: HashMap<String, Binding>,
    commands: Arc<[String]>,
}

/// Immutable binding table, cheap to clone into dispatch tasks
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Registered tokens, in registration order
    pub fn commands(&self) -> &[String] {
        &self.inner.commands
    }

    /// Route one event: unknown tokens are dropped, guards run in order and
    /// the first rejection stops processing.
    pub async fn dispatch(&self, event: CommandEvent) -> DispatchOutcome {
        let Some(binding) = self.inner.bindings.get(&event.command) else {
            tracing::info!(
                "Ignoring unknown command /{} from {}",
                event.command,
                event.sender_id
            );
            return DispatchOutcome::Unknown;
        };

        let mut ctx = Context::new(self.inner.commands.clone());
        tracing::info!(
            "[{}] /{} from {} ({})",
            ctx.dispatch_id,
            event.command,
            event.sender_name,
            event.sender_id
        );

        for guard in &binding.guards {
            if !guard.check(&mut ctx, &event).await {
                tracing::warn!(
                    "[{}] /{} rejected by {}",
                    ctx.dispatch_id,
                    event.command,
                    guard.name()
                );
                return DispatchOutcome::Rejected(guard.name());
            }
        }

        binding.handler.handle(&ctx, &event).await;
        tracing::debug!(
            "[{}] /{} handled in {:?}",
            ctx.dispatch_id,
            event.command,
            ctx.started_at.elapsed()
        );
        DispatchOutcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::middleware::{GuardChain, RequireAdmin};
    use crate::application::services::LedgerService;
    use crate::infrastructure::adapters::recording::RecordingBot;
    use crate::infrastructure::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Counter(Arc<AtomicUsize>);

    impl Counter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Handler for Counter {
        async fn handle(&self, _ctx: &Context, _event: &CommandEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixed {
        name: &'static str,
        answer: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Guard for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn check(&self, _ctx: &mut Context, _event: &CommandEvent) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    #[tokio::test]
    async fn unknown_tokens_are_dropped() {
        let handler = Counter::default();
        let mut builder = Router::builder();
        builder.register("help", handler.clone(), Vec::new());
        let router = builder.build();

        assert_eq!(router.dispatch(CommandEvent::new("nope", "")).await, DispatchOutcome::Unknown);
        // Tokens are case-sensitive
        assert_eq!(router.dispatch(CommandEvent::new("Help", "")).await, DispatchOutcome::Unknown);
        assert_eq!(handler.count(), 0);
    }

    #[tokio::test]
    async fn first_rejection_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let handler = Counter::default();

        let guards = GuardChain::new()
            .add(Fixed { name: "allow", answer: true, calls: calls.clone() })
            .add(Fixed { name: "deny", answer: false, calls: calls.clone() })
            .add(Fixed { name: "never", answer: true, calls: later.clone() })
            .build();

        let mut builder = Router::builder();
        builder.register("billing_del", handler.clone(), guards);
        let router = builder.build();

        let outcome = router.dispatch(CommandEvent::new("billing_del", "rent")).await;
        assert_eq!(outcome, DispatchOutcome::Rejected("deny"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(handler.count(), 0);
    }

    #[tokio::test]
    async fn last_registration_wins_and_keeps_position() {
        let first = Counter::default();
        let second = Counter::default();

        let mut builder = Router::builder();
        builder
            .register("reply", first.clone(), Vec::new())
            .register("help", Counter::default(), Vec::new())
            .register("reply", second.clone(), Vec::new());
        let router = builder.build();

        assert_eq!(router.commands(), ["reply".to_string(), "help".to_string()]);
        assert_eq!(router.dispatch(CommandEvent::new("reply", "hi")).await, DispatchOutcome::Handled);
        assert_eq!(first.count(), 0);
        assert_eq!(second.count(), 1);
    }

    #[tokio::test]
    async fn admin_guard_protects_billing_del() {
        let service = LedgerService::new(Arc::new(MemoryStore::new()));
        service.create_user(1, "Owner", true).await.unwrap();
        service.create_user(2, "Guest", false).await.unwrap();
        let bot = Arc::new(RecordingBot::new());

        let handler = Counter::default();
        let mut builder = Router::builder();
        builder.register(
            "billing_del",
            handler.clone(),
            GuardChain::new().add(RequireAdmin::new(service, bot.clone())).build(),
        );
        let router = builder.build();

        let guest = CommandEvent::new("billing_del", "rent").with_sender(2, "Guest");
        assert_eq!(router.dispatch(guest).await, DispatchOutcome::Rejected("require_admin"));
        assert_eq!(handler.count(), 0);

        let owner = CommandEvent::new("billing_del", "rent").with_sender(1, "Owner");
        assert_eq!(router.dispatch(owner).await, DispatchOutcome::Handled);
        assert_eq!(handler.count(), 1);
    }

    #[tokio::test]
    async fn concurrent_dispatches_share_the_table() {
        let handler = Counter::default();
        let mut builder = Router::builder();
        builder.register("reply", handler.clone(), Vec::new());
        let router = builder.build();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let router = router.clone();
                tokio::spawn(async move { router.dispatch(CommandEvent::new("reply", i.to_string())).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), DispatchOutcome::Handled);
        }
        assert_eq!(handler.count(), 16);
    }
}
