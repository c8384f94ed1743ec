//! Presentation adapters - Platform integrations

pub mod console;
pub mod telegram;

#[cfg(any(test, feature = "test-util"))]
pub mod recording;
