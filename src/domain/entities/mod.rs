//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod billing;
pub mod event;
pub mod identifier;
pub mod media;

pub use user::User;
pub use billing::{Billing, Payment};
pub use event::CommandEvent;
pub use identifier::{BillingKey, IdentifierError, UserKey};
pub use media::Media;
