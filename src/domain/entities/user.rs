use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered chat user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub telegram_id: i64,
    pub telegram_name: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New unsaved user. Identifier and creation time are assigned by the service.
    pub fn new(telegram_id: i64, telegram_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            telegram_id,
            telegram_name: telegram_name.into(),
            admin: false,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Best available human label: name, then telegram id, then internal id
    pub fn display_name(&self) -> String {
        if !self.telegram_name.trim().is_empty() {
            self.telegram_name.clone()
        } else if self.telegram_id != 0 {
            self.telegram_id.to_string()
        } else {
            self.id.to_string()
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_ids() {
        let user = User::new(42, "");
        assert_eq!(user.display_name(), "42");

        let user = User::new(0, " ");
        assert_eq!(user.display_name(), Uuid::nil().to_string());

        let user = User::new(42, "Ada Lovelace");
        assert_eq!(user.to_string(), "Ada Lovelace");
    }
}
