//! Telegram adapter

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::commands;
use crate::application::errors::BotError;
use crate::application::messaging::CommandParser;
use crate::domain::entities::{CommandEvent, Media};
use crate::domain::traits::{Bot, BotInfo};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// "First Last", falling back to the username
    pub fn full_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.username.clone().unwrap_or_default()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope of every Bot API response
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct MessageResult {
    message_id: i64,
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: BotInfo,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "misaki".to_string(),
                username: "misaki_bot".to_string(),
            },
        }
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BotError> {
        let status = response.status();
        let data: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(format!("{} ({})", e, status)))?;

        if !data.ok {
            return Err(BotError::Api(
                data.description.unwrap_or_else(|| status.to_string()),
            ));
        }
        data.result
            .ok_or_else(|| BotError::Parse("response without result".to_string()))
    }

    async fn call<R: Serialize, T: DeserializeOwned>(&self, method: &str, request: &R) -> Result<T, BotError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            first_name: String,
            username: String,
        }

        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;
        let data: BotInfoResponse = Self::decode(response).await?;

        self.info = BotInfo {
            id: data.id.to_string(),
            name: data.first_name,
            username: data.username,
        };

        Ok(())
    }

    /// Long-poll for updates using the getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: i64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: i64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string()],
        };

        self.call("getUpdates", &request).await
    }

    /// Offset acknowledging every update seen so far
    pub fn next_offset(current: i64, updates: &[Update]) -> i64 {
        updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .map_or(current, |next| next.max(current))
    }

    /// Command event of a text message addressed to this bot
    pub fn event_from_update(parser: &CommandParser, update: &Update) -> Option<CommandEvent> {
        let message = update.message.as_ref()?;
        let from = message.from.as_ref()?;
        let event = parser.parse(message.text.as_deref()?)?;

        Some(
            event
                .with_sender(from.id, from.full_name())
                .with_chat(message.chat.id, message.message_id),
        )
    }

    /// Send a message with specific parse mode
    pub async fn send_message_with_format(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        parse_mode: Option<&str>,
    ) -> Result<i64, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: i64,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            parse_mode: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_to_message_id: Option<i64>,
        }

        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            reply_to_message_id: reply_to,
        };

        let result: MessageResult = self.call("sendMessage", &request).await?;
        Ok(result.message_id)
    }

    /// Register bot commands with Telegram
    pub async fn register_commands(&self, tokens: &[String]) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct Command<'a> {
            command: &'a str,
            description: &'a str,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest<'a> {
            commands: Vec<Command<'a>>,
        }

        let entries = tokens
            .iter()
            .map(|token| Command {
                command: token.as_str(),
                description: commands::describe(token).unwrap_or(token.as_str()),
            })
            .collect();

        let _: bool = self
            .call("setMyCommands", &SetMyCommandsRequest { commands: entries })
            .await?;

        tracing::info!("Registered {} bot commands with Telegram", tokens.len());
        Ok(())
    }

    /// Send chat action (typing, upload_video, etc.)
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct SendChatActionRequest<'a> {
            chat_id: i64,
            action: &'a str,
        }

        let _: bool = self
            .call("sendChatAction", &SendChatActionRequest { chat_id, action })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    /// Markdown first, plain text when Telegram refuses to parse it
    async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<i64, BotError> {
        tracing::debug!("Sending to {}: {}", chat_id, text);

        match self
            .send_message_with_format(chat_id, text, reply_to, Some("Markdown"))
            .await
        {
            Ok(message_id) => Ok(message_id),
            Err(BotError::Api(e)) => {
                tracing::warn!("Markdown failed, using plain text: {}", e);
                self.send_message_with_format(chat_id, text, reply_to, None).await
            }
            Err(e) => Err(e),
        }
    }

    async fn send_media(&self, chat_id: i64, media: &Media, reply_to: Option<i64>) -> Result<i64, BotError> {
        let (method, field, action) = if media.audio_only {
            ("sendAudio", "audio", "upload_audio")
        } else {
            ("sendVideo", "video", "upload_video")
        };

        if let Err(e) = self.send_chat_action(chat_id, action).await {
            tracing::debug!("Chat action failed: {}", e);
        }

        let part = Part::bytes(media.content.clone()).file_name(media.file_name.clone());
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field.to_string(), part);
        if let Some(reply_to) = reply_to {
            form = form.text("reply_to_message_id", reply_to.to_string());
        }

        let response = self
            .client
            .post(self.api_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let result: MessageResult = Self::decode(response).await?;
        Ok(result.message_id)
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
