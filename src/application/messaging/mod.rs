//! Message handling - Command routing and guard middleware

pub mod middleware;
pub mod parser;
pub mod router;

pub use middleware::{reply, Context, Guard, GuardChain, RequireAdmin, RequireAdminOrSelf, REQUESTER_ADMIN};
pub use parser::{split_args, CommandParser};
pub use router::{DispatchOutcome, Handler, Router, RouterBuilder};
