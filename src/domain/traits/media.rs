use async_trait::async_trait;
use crate::domain::entities::Media;
use crate::application::errors::MediaError;

/// Fetches a media file from a URL. Errors carry a message fit for users.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Media, MediaError>;
}
