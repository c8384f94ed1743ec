//! Console adapter for development/testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::errors::BotError;
use crate::application::messaging::{CommandParser, Router};
use crate::domain::entities::Media;
use crate::domain::traits::{Bot, BotInfo};
use crate::infrastructure::config::ConsoleConfig;

const CONSOLE_CHAT_ID: i64 = 0;

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    identity: ConsoleConfig,
    next_message_id: AtomicI64,
}

impl ConsoleAdapter {
    pub fn new(identity: ConsoleConfig) -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "misaki".to_string(),
                username: "console".to_string(),
            },
            identity,
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Read stdin line by line and dispatch every command, as the
    /// configured identity, until EOF
    pub async fn run(&self, router: &Router) -> Result<(), BotError> {
        tracing::info!(
            "Starting console bot (dev mode) as {} ({})",
            self.identity.user_name,
            self.identity.user_id
        );
        println!("Type commands like /help, Ctrl-D to quit");

        let parser = CommandParser::default();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let Some(event) = parser.parse(&line) else {
                if !line.trim().is_empty() {
                    println!("[BOT] commands start with /");
                }
                continue;
            };

            let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
            let event = event
                .with_sender(self.identity.user_id, self.identity.user_name.clone())
                .with_chat(CONSOLE_CHAT_ID, message_id);
            router.dispatch(event).await;
        }

        tracing::info!("Console closed");
        Ok(())
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn send_message(&self, _chat_id: i64, text: &str, _reply_to: Option<i64>) -> Result<i64, BotError> {
        println!("[BOT] {}", text);
        Ok(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn send_media(&self, _chat_id: i64, media: &Media, _reply_to: Option<i64>) -> Result<i64, BotError> {
        let kind = if media.audio_only { "audio" } else { "video" };
        println!("[BOT] <{} {} ({} bytes)>", kind, media.file_name, media.size());
        Ok(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
