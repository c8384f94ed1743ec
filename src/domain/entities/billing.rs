use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::User;

/// A shared expense split between its participants
#[derive(Debug, Clone, PartialEq)]
pub struct Billing {
    pub id: Uuid,
    pub name: String,
    pub value: f64,
    pub created_at: DateTime<Utc>,
    /// Derived on detailed reads, `None` without participants
    pub value_per_user: Option<f64>,
    pub payments: Vec<Payment>,
}

impl Billing {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            value,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            value_per_user: None,
            payments: Vec::new(),
        }
    }

    pub fn participants(&self) -> usize {
        self.payments.len()
    }

    /// Recompute `value_per_user` from the loaded payment rows
    pub fn compute_value_per_user(&mut self) {
        self.value_per_user = match self.payments.len() {
            0 => None,
            n => Some(self.value / n as f64),
        };
    }
}

/// Association between a bill and one of its participants.
/// The row existing is what makes the user a participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub billing_id: Uuid,
    pub user_id: Uuid,
    pub paid: bool,
    /// Last time the payment moved to paid. Kept when reverted to unpaid.
    pub paid_at: Option<DateTime<Utc>>,
    /// Participant, joined in when read through a bill
    pub user: Option<User>,
}

impl Payment {
    pub fn new(billing_id: Uuid, user_id: Uuid) -> Self {
        Self {
            billing_id,
            user_id,
            paid: false,
            paid_at: None,
            user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_per_user_needs_participants() {
        let mut billing = Billing::new("rent", 120.0);
        billing.compute_value_per_user();
        assert_eq!(billing.value_per_user, None);

        billing.payments.push(Payment::new(Uuid::now_v7(), Uuid::now_v7()));
        billing.payments.push(Payment::new(Uuid::now_v7(), Uuid::now_v7()));
        billing.payments.push(Payment::new(Uuid::now_v7(), Uuid::now_v7()));
        billing.compute_value_per_user();
        assert_eq!(billing.value_per_user, Some(40.0));
    }
}
