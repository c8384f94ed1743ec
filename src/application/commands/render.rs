//! Telegram Markdown rendering of command results

use chrono::{DateTime, Utc};

use crate::application::errors::ServiceError;
use crate::domain::entities::{Billing, Payment, User};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn time(at: &DateTime<Utc>) -> String {
    at.format(TIME_FORMAT).to_string()
}

fn optional_time(at: Option<&DateTime<Utc>>) -> String {
    at.map(time).unwrap_or_else(|| "-".to_string())
}

/// Escape legacy Markdown markers outside of code spans
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn user_fields(user: &User) -> String {
    format!(
        "🆔 *ID:* `{}`\n\
         🌎 *Telegram ID:* `{}`\n\
         💬 *Telegram Name:* `{}`\n\
         👮 *Admin:* {}\n\
         📅 *Created At:* {}\n",
        user.id,
        user.telegram_id,
        user.telegram_name,
        user.admin,
        time(&user.created_at)
    )
}

pub fn user_details(user: &User) -> String {
    format!("👤 *User Details:*\n{}", user_fields(user))
}

pub fn user_created(user: &User) -> String {
    format!(
        "🎉 *User Created Successfully!*\n\n👤 *User Details:*\n{}",
        user_fields(user)
    )
}

pub fn user_deleted(key: &str) -> String {
    format!("👤 *User Deleted:* {}", escape(key))
}

pub fn billing_created(billing: &Billing) -> String {
    format!(
        "🤑 *Billing Created Successfully!*\n\n\
         💰 *Billing Details:*\n\
         🆔 *ID:* `{}`\n\
         💬 *Name:* `{}`\n\
         💸 *Value:* {:.2}\n\
         📅 *Created At:* {}\n",
        billing.id,
        billing.name,
        billing.value,
        time(&billing.created_at)
    )
}

/// Detailed view with one block per participant
pub fn billing_details(billing: &Billing) -> String {
    let per_user = billing
        .value_per_user
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string());

    let mut text = format!(
        "🤑 *Billing Details*\n\n\
         🆔 *ID:* `{}`\n\
         💬 *Name:* `{}`\n\
         👤 *Users Associated:* {}\n\
         💰 *Value:* {:.2}\n\
         💸 *Value per User:* {}\n\
         📅 *Created At:* {}\n\n",
        billing.id,
        billing.name,
        billing.participants(),
        billing.value,
        per_user,
        time(&billing.created_at)
    );

    for payment in &billing.payments {
        let name = payment
            .user
            .as_ref()
            .map(User::display_name)
            .unwrap_or_else(|| payment.user_id.to_string());
        text.push_str(&format!(
            "👤 *User:* `{}`\n💵 *Paid:* {}\n📅 *Paid At:* {}\n\n",
            name,
            payment.paid,
            optional_time(payment.paid_at.as_ref())
        ));
    }

    text
}

pub fn billing_list(billings: &[Billing]) -> String {
    let mut text = format!("🤑 *Billings Found:* {}\n\n", billings.len());
    for billing in billings {
        text.push_str(&format!(
            "🆔 `{}`\n💬 `{}`\n💸 {:.2}\n\n",
            billing.id, billing.name, billing.value
        ));
    }
    text
}

pub fn billing_deleted(key: &str) -> String {
    format!("🤑 *Billing Deleted:* {}", escape(key))
}

pub fn association(payment: &Payment, associate: bool) -> String {
    let kind = if associate { "Association" } else { "Disassociation" };
    format!(
        "🔄 *Billing {}*\n\n👤 *User ID:* `{}`\n💸 *Billing ID:* `{}`\n",
        kind, payment.user_id, payment.billing_id
    )
}

pub fn payment_status(payment: &Payment) -> String {
    let status = if payment.paid {
        format!(
            "💵 *Status:* Paid\n📅 *Paid At:* {}",
            optional_time(payment.paid_at.as_ref())
        )
    } else {
        "💵 *Status:* Unpaid".to_string()
    };

    format!(
        "🔄 *Billing Payment*\n\n👤 *User ID:* `{}`\n💸 *Billing ID:* `{}`\n{}\n",
        payment.user_id, payment.billing_id, status
    )
}

/// Command list with help text, one command per line
pub fn help<'a>(commands: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> String {
    let mut text = String::from("📝 *Commands List*\n\n");
    for (token, description) in commands {
        match description {
            Some(description) => text.push_str(&format!("/{} - {}\n", escape(token), escape(description))),
            None => text.push_str(&format!("/{}\n", escape(token))),
        }
    }
    text
}

pub fn invalid_arguments(expected: &str) -> String {
    format!("⚠️ Invalid number of arguments received, expected: {}", expected)
}

/// User-facing text for a failed operation; storage details never leak
pub fn error(action: &str, err: &ServiceError) -> String {
    match err {
        ServiceError::InvalidArgument(msg) => format!("⚠️ Error while {}: {}", action, escape(msg)),
        ServiceError::NotFound { entity: "payment", .. } => "⚠️ Payment association not found".to_string(),
        ServiceError::NotFound { entity, key } => {
            format!("⚠️ {} {} not found", capitalize(entity), escape(key))
        }
        ServiceError::AlreadyExists { entity, key } => {
            format!("⚠️ {} {} already exists", capitalize(entity), escape(key))
        }
        ServiceError::Conflict(_) => format!("⚠️ Conflict while {}, already associated", action),
        ServiceError::Storage(_) => format!("⚠️ Internal error while {}", action),
    }
}
