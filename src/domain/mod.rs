//! Domain layer - Core business objects and the ports they need
//! 
//! This layer contains:
//! - Entities: Users, bills, payments, inbound command events
//! - Traits: Abstractions for infrastructure (Store, Bot, MediaDownloader)

pub mod entities;
pub mod traits;
