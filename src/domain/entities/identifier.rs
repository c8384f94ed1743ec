//! Lookup keys parsed from free-text command arguments
//!
//! A string that is a well-formed UUID always means the internal id.
//! Anything else is read as the entity's natural key: the telegram id for
//! users, the name for bills.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier cannot be empty")]
    Empty,

    #[error("invalid identifier informed: {0}")]
    Invalid(String),
}

/// How a user is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey {
    Id(Uuid),
    TelegramId(i64),
}

impl UserKey {
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if let Ok(id) = Uuid::parse_str(input) {
            return Ok(UserKey::Id(id));
        }
        input
            .parse::<i64>()
            .map(UserKey::TelegramId)
            .map_err(|_| IdentifierError::Invalid(input.to_string()))
    }

    /// A nil id or a non-positive telegram id can never match a stored user
    pub fn is_usable(&self) -> bool {
        match self {
            UserKey::Id(id) => !id.is_nil(),
            UserKey::TelegramId(tid) => *tid > 0,
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Id(id) => write!(f, "{}", id),
            UserKey::TelegramId(tid) => write!(f, "{}", tid),
        }
    }
}

/// How a bill is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingKey {
    Id(Uuid),
    Name(String),
}

impl BillingKey {
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(IdentifierError::Empty);
        }
        match Uuid::parse_str(input) {
            Ok(id) => Ok(BillingKey::Id(id)),
            Err(_) => Ok(BillingKey::Name(input.to_string())),
        }
    }

    pub fn is_usable(&self) -> bool {
        match self {
            BillingKey::Id(id) => !id.is_nil(),
            BillingKey::Name(name) => !name.is_empty(),
        }
    }
}

impl fmt::Display for BillingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingKey::Id(id) => write!(f, "{}", id),
            BillingKey::Name(name) => write!(f, "{}", name),
        }
    }
}
