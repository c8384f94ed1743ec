use crate::application::messaging::Context;
use crate::domain::entities::CommandEvent;

use super::{describe, render, Commands};

impl Commands {
    pub(super) async fn reply(&self, event: &CommandEvent) {
        let text = if event.has_args() {
            event.args.clone()
        } else {
            format!("/{}", event.command)
        };
        self.send(event, &text).await;
    }

    pub(super) async fn help(&self, ctx: &Context, event: &CommandEvent) {
        let text = render::help(
            ctx.commands()
                .iter()
                .map(|token| (token.as_str(), describe(token))),
        );
        self.send(event, &text).await;
    }

    pub(super) async fn download_youtube(&self, event: &CommandEvent) {
        let Some(downloader) = &self.downloader else {
            self.send(event, "⚠️ Media downloads are disabled").await;
            return;
        };

        if !event.has_args() {
            self.send(event, &render::invalid_arguments("<youtube-url>")).await;
            return;
        }

        self.send(event, "📶 Downloading media...").await;

        let media = match downloader.download(event.args.trim()).await {
            Ok(media) => media,
            Err(e) => {
                tracing::info!("Media download failed for {:?}: {}", event.args, e);
                self.send(event, &format!("⚠️ Error to download media: {}", e)).await;
                return;
            }
        };

        tracing::info!(
            "Sending {} ({} bytes) to chat {}",
            media.file_name,
            media.size(),
            event.chat_id
        );
        if let Err(e) = self
            .bot
            .send_media(event.chat_id, &media, Some(event.message_id))
            .await
        {
            tracing::error!("error while sending media to chat {}: {}", event.chat_id, e);
        }
    }
}
