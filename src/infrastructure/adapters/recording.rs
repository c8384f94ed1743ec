//! In-process `Bot` that records everything sent through it

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use crate::application::errors::BotError;
use crate::domain::entities::Media;
use crate::domain::traits::{Bot, BotInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { chat_id: i64, text: String, reply_to: Option<i64> },
    Media { chat_id: i64, file_name: String, audio_only: bool },
}

/// Replies and uploads are kept in send order
#[derive(Default)]
pub struct RecordingBot {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                Sent::Media { .. } => None,
            })
            .collect()
    }

    fn push(&self, sent: Sent) -> i64 {
        let mut log = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        log.push(sent);
        log.len() as i64
    }
}

#[async_trait]
impl Bot for RecordingBot {
    async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<i64, BotError> {
        Ok(self.push(Sent::Text {
            chat_id,
            text: text.to_string(),
            reply_to,
        }))
    }

    async fn send_media(&self, chat_id: i64, media: &Media, _reply_to: Option<i64>) -> Result<i64, BotError> {
        Ok(self.push(Sent::Media {
            chat_id,
            file_name: media.file_name.clone(),
            audio_only: media.audio_only,
        }))
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "0".to_string(),
            name: "recorder".to_string(),
            username: "recorder_bot".to_string(),
        }
    }
}
