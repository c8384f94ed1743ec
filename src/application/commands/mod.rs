//! Bot commands - the handlers bound into the router
//!
//! Every handler recovers its own failures into a reply, nothing is
//! propagated back to the router.

mod billing;
mod general;
pub mod render;
mod users;

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::ServiceError;
use crate::application::messaging::{
    reply, Context, Guard, GuardChain, Handler, RequireAdmin, RequireAdminOrSelf, RouterBuilder,
};
use crate::application::services::LedgerService;
use crate::domain::entities::CommandEvent;
use crate::domain::traits::{Bot, MediaDownloader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Reply,
    Help,
    GetUser,
    CreateUser,
    DeleteUser,
    GetBilling,
    ListBillings,
    CreateBilling,
    DeleteBilling,
    AssociatePayment,
    DisassociatePayment,
    PayBilling,
    UnpayBilling,
    PayBillingAdmin,
    UnpayBillingAdmin,
    DownloadYoutube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Anyone,
    Admin,
    AdminOrSelf,
}

/// A command token with its help text
pub struct Route {
    pub token: &'static str,
    pub description: &'static str,
    action: Action,
    access: Access,
}

const fn route(token: &'static str, description: &'static str, action: Action, access: Access) -> Route {
    Route {
        token,
        description,
        action,
        access,
    }
}

/// All bot commands, in the order they are listed by `/help`
pub const ROUTES: &[Route] = &[
    route("reply", "Echo the message back", Action::Reply, Access::Anyone),
    route("help", "List available commands", Action::Help, Access::Anyone),
    route("user", "Show a user, yourself by default", Action::GetUser, Access::Anyone),
    route("user_add", "Register yourself", Action::CreateUser, Access::Anyone),
    route("user_del", "Delete a user, yourself by default", Action::DeleteUser, Access::AdminOrSelf),
    route("billing", "Show a billing and its participants", Action::GetBilling, Access::Anyone),
    route("billing_list", "List all billings", Action::ListBillings, Access::Anyone),
    route("billing_add", "Create a billing: <name> <value>", Action::CreateBilling, Access::Admin),
    route("billing_del", "Delete a billing", Action::DeleteBilling, Access::Admin),
    route(
        "payment_associate",
        "Add a participant: <billing> <user>",
        Action::AssociatePayment,
        Access::Admin,
    ),
    route(
        "payment_disassociate",
        "Remove a participant: <billing> <user>",
        Action::DisassociatePayment,
        Access::Admin,
    ),
    route("billing_pay", "Mark your share as paid", Action::PayBilling, Access::Anyone),
    route("billing_unpay", "Mark your share as unpaid", Action::UnpayBilling, Access::Anyone),
    route(
        "billing_pay_admin",
        "Mark a share as paid: <billing> <user>",
        Action::PayBillingAdmin,
        Access::Admin,
    ),
    route(
        "billing_unpay_admin",
        "Mark a share as unpaid: <billing> <user>",
        Action::UnpayBillingAdmin,
        Access::Admin,
    ),
    route("youtube", "Download a YouTube video", Action::DownloadYoutube, Access::Anyone),
];

/// Help text of a registered token
pub fn describe(token: &str) -> Option<&'static str> {
    ROUTES.iter().find(|r| r.token == token).map(|r| r.description)
}

/// Shared state of the command handlers
pub struct Commands {
    service: LedgerService,
    bot: Arc<dyn Bot>,
    downloader: Option<Arc<dyn MediaDownloader>>,
    owner_id: Option<i64>,
}

impl Commands {
    pub fn new(service: LedgerService, bot: Arc<dyn Bot>) -> Self {
        Self {
            service,
            bot,
            downloader: None,
            owner_id: None,
        }
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn MediaDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Telegram identity that becomes admin when it registers
    pub fn with_owner(mut self, owner_id: Option<i64>) -> Self {
        self.owner_id = owner_id;
        self
    }

    async fn send(&self, event: &CommandEvent, text: &str) {
        reply(self.bot.as_ref(), event, text).await;
    }

    /// Log a failed operation and reply with its rendering
    async fn fail(&self, event: &CommandEvent, action: &str, err: ServiceError) {
        match &err {
            ServiceError::Storage(e) => tracing::error!(
                "{} failed (/{} {:?} from {}): {}",
                action,
                event.command,
                event.args,
                event.sender_id,
                e
            ),
            other => tracing::info!("{} rejected (/{} from {}): {}", action, event.command, event.sender_id, other),
        }
        self.send(event, &render::error(action, &err)).await;
    }
}

/// Bind every route to the router, with the guards its access level needs
pub fn register_routes(builder: &mut RouterBuilder, commands: Arc<Commands>) {
    let admin: Arc<dyn Guard> = Arc::new(RequireAdmin::new(commands.service.clone(), commands.bot.clone()));
    let admin_or_self: Arc<dyn Guard> =
        Arc::new(RequireAdminOrSelf::new(commands.service.clone(), commands.bot.clone()));

    for route in ROUTES {
        let guards = match route.access {
            Access::Anyone => GuardChain::new(),
            Access::Admin => GuardChain::new().add_shared(admin.clone()),
            Access::AdminOrSelf => GuardChain::new().add_shared(admin_or_self.clone()),
        }
        .build();

        let handler = CommandHandler {
            commands: commands.clone(),
            action: route.action,
        };
        builder.register(route.token, handler, guards);
    }
}

struct CommandHandler {
    commands: Arc<Commands>,
    action: Action,
}

#[async_trait]
impl Handler for CommandHandler {
    async fn handle(&self, ctx: &Context, event: &CommandEvent) {
        let commands = &self.commands;
        match self.action {
            Action::Reply => commands.reply(event).await,
            Action::Help => commands.help(ctx, event).await,
            Action::GetUser => commands.get_user(event).await,
            Action::CreateUser => commands.create_user(event).await,
            Action::DeleteUser => commands.delete_user(ctx, event).await,
            Action::GetBilling => commands.get_billing(event).await,
            Action::ListBillings => commands.list_billings(event).await,
            Action::CreateBilling => commands.create_billing(event).await,
            Action::DeleteBilling => commands.delete_billing(event).await,
            Action::AssociatePayment => commands.change_association(event, true).await,
            Action::DisassociatePayment => commands.change_association(event, false).await,
            Action::PayBilling => commands.change_own_payment(event, true).await,
            Action::UnpayBilling => commands.change_own_payment(event, false).await,
            Action::PayBillingAdmin => commands.change_payment(event, true).await,
            Action::UnpayBillingAdmin => commands.change_payment(event, false).await,
            Action::DownloadYoutube => commands.download_youtube(event).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn routes_are_unique_and_described() {
        let tokens: HashSet<_> = ROUTES.iter().map(|r| r.token).collect();
        assert_eq!(tokens.len(), ROUTES.len());
        assert!(ROUTES.iter().all(|r| !r.description.is_empty()));
        assert_eq!(describe("billing_add"), Some("Create a billing: <name> <value>"));
        assert_eq!(describe("nope"), None);
    }

    #[test]
    fn mutating_commands_are_guarded() {
        let admin_only = ["billing_add", "billing_del", "payment_associate", "payment_disassociate"];
        for token in admin_only {
            let route = ROUTES.iter().find(|r| r.token == token).unwrap();
            assert_eq!(route.access, Access::Admin, "/{} must require admin", token);
        }
    }
}
