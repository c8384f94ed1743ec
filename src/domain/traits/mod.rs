//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod media;
pub mod store;

pub use bot::{Bot, BotInfo};
pub use media::MediaDownloader;
pub use store::Store;
