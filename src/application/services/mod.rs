//! Application services - Business logic orchestration

pub mod ledger_service;
mod billing;

pub use ledger_service::LedgerService;
