//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Ledger operations over users, bills and payments
//! - Commands: Bot command handlers and rendering
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing, guards, routing

pub mod commands;
pub mod errors;
pub mod messaging;
pub mod services;
