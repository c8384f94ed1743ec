//! YouTube downloads through the `yt-dlp` binary

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::application::errors::MediaError;
use crate::domain::entities::Media;
use crate::domain::traits::MediaDownloader;
use crate::infrastructure::config::MediaConfig;

const TITLE_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Accepts `youtu.be` links, `youtube.com/watch?v=` and `youtube.com/shorts/`
pub fn is_youtube_url(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    if host.contains("youtu.be") {
        return true;
    }

    if !host.contains("youtube.com") {
        return false;
    }

    let watch = url.path() == "/watch" && url.query().is_some_and(|q| q.starts_with("v="));
    watch || url.path().starts_with("/shorts/")
}

/// File name for a downloaded title, path separators removed
fn file_name(title: &str, audio_only: bool) -> String {
    let title: String = title
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let title = if title.is_empty() { "media".to_string() } else { title };
    let extension = if audio_only { "m4a" } else { "mp4" };
    format!("{}.{}", title, extension)
}

pub struct YtDlpDownloader {
    binary: PathBuf,
    audio_only: bool,
    max_bytes: usize,
}

impl YtDlpDownloader {
    pub fn new(config: &MediaConfig) -> Self {
        let max_bytes = usize::try_from(config.max_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX);
        Self {
            binary: config.binary.clone(),
            audio_only: config.audio_only,
            max_bytes,
        }
    }

    async fn title(&self, url: &Url) -> Result<String, MediaError> {
        let output = tokio::time::timeout(
            TITLE_TIMEOUT,
            Command::new(&self.binary)
                .args(["--no-playlist", "--print", "title", url.as_str()])
                .stdin(Stdio::null())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| MediaError::new("timed out getting media data"))?
        .map_err(|e| {
            tracing::error!("Failed to start {}: {}", self.binary.display(), e);
            MediaError::new("downloader is not available")
        })?;

        if !output.status.success() {
            tracing::info!(
                "yt-dlp title lookup failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(MediaError::new("error getting media data"));
        }

        let title = String::from_utf8_lossy(&output.stdout);
        Ok(title.lines().next().unwrap_or_default().to_string())
    }

    /// Stream the best format to stdout, aborting past the size cap
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, MediaError> {
        let format = if self.audio_only { "bestaudio" } else { "best" };
        let mut child = Command::new(&self.binary)
            .args(["--no-playlist", "--quiet", "-f", format, "-o", "-", url.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to start {}: {}", self.binary.display(), e);
                MediaError::new("downloader is not available")
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::new("error downloading media"))?;

        let read = async {
            let mut content = Vec::new();
            let mut chunk = vec![0u8; 64 * 1024];
            loop {
                let n = match stdout.read(&mut chunk).await {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::info!("Reading yt-dlp output failed: {}", e);
                        return Err(MediaError::new("error downloading media"));
                    }
                };
                if n == 0 {
                    return Ok(content);
                }
                if content.len() + n > self.max_bytes {
                    return Err(MediaError::new(format!(
                        "media is larger than {} MB",
                        self.max_bytes / (1024 * 1024)
                    )));
                }
                content.extend_from_slice(&chunk[..n]);
            }
        };

        let content = match tokio::time::timeout(DOWNLOAD_TIMEOUT, read).await {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(e);
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(MediaError::new("download timed out"));
            }
        };

        let status = child
            .wait()
            .await
            .map_err(|_| MediaError::new("error downloading media"))?;
        if !status.success() || content.is_empty() {
            return Err(MediaError::new("error downloading media"));
        }

        Ok(content)
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download(&self, raw_url: &str) -> Result<Media, MediaError> {
        let url = Url::parse(raw_url.trim()).map_err(|e| {
            tracing::info!("Error parsing url {:?}: {}", raw_url, e);
            MediaError::new("invalid url informed")
        })?;

        if !is_youtube_url(&url) {
            tracing::info!("Not a youtube url: {}", url);
            return Err(MediaError::new("url is not a youtube link"));
        }

        let title = self.title(&url).await?;
        let content = self.fetch(&url).await?;
        tracing::info!("Downloaded {:?} ({} bytes)", title, content.len());

        Ok(Media {
            file_name: file_name(&title, self.audio_only),
            content,
            audio_only: self.audio_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(url: &str) -> bool {
        is_youtube_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn recognises_youtube_links() {
        assert!(check("https://youtu.be/dQw4w9WgXcQ"));
        assert!(check("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(check("https://m.youtube.com/shorts/abc123"));

        assert!(!check("https://www.youtube.com/channel/xyz"));
        assert!(!check("https://www.youtube.com/watch?list=abc"));
        assert!(!check("https://vimeo.com/12345"));
    }

    #[test]
    fn names_files_after_the_title() {
        assert_eq!(file_name("My Video", false), "My Video.mp4");
        assert_eq!(file_name("AC/DC live", true), "AC_DC live.m4a");
        assert_eq!(file_name("  ", false), "media.mp4");
    }

    #[tokio::test]
    async fn rejects_non_youtube_urls_before_spawning() {
        let config = MediaConfig {
            enabled: true,
            binary: PathBuf::from("/nonexistent/yt-dlp"),
            audio_only: false,
            max_size_mb: 1,
        };
        let downloader = YtDlpDownloader::new(&config);

        let err = downloader.download("not a url").await.unwrap_err();
        assert_eq!(err.0, "invalid url informed");

        let err = downloader.download("https://vimeo.com/1").await.unwrap_err();
        assert_eq!(err.0, "url is not a youtube link");
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let config = MediaConfig {
            enabled: true,
            binary: PathBuf::from("/nonexistent/yt-dlp"),
            audio_only: false,
            max_size_mb: 1,
        };
        let downloader = YtDlpDownloader::new(&config);

        let err = downloader.download("https://youtu.be/abc").await.unwrap_err();
        assert_eq!(err.0, "downloader is not available");
    }
}
