use async_trait::async_trait;
use crate::domain::entities::Media;
use crate::application::errors::BotError;

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: Send + Sync {
    /// Send a text message to a chat, optionally as a reply
    async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<i64, BotError>;

    /// Send a downloaded audio or video file
    async fn send_media(&self, chat_id: i64, media: &Media, reply_to: Option<i64>) -> Result<i64, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
