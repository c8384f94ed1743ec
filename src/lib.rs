//! misaki-bot - chat commands over a shared-expense ledger

pub mod application;
pub mod domain;
pub mod infrastructure;
