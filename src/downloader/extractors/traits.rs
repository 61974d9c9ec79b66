// ExtractionProvider trait and common types

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::downloader::models::{RawRendition, VideoId};

/// Browser-like user agent; the upstream rejects default library agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Client identity injected into every provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: String,
    /// Netscape cookies file, passed through untouched
    pub cookie_context: Option<PathBuf>,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_context: None,
        }
    }
}

impl ClientIdentity {
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        if let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) {
            self.user_agent = ua;
        }
        self
    }

    pub fn with_cookie_context(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookie_context = cookies;
        self
    }
}

/// Post-processing requested from the provider after the fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    None,
    /// Transcode to an audio-only file (performed by the provider's toolchain)
    ExtractAudio { codec: String, bitrate_kbps: u32 },
}

impl PostProcess {
    pub fn mp3(bitrate_kbps: u32) -> Self {
        Self::ExtractAudio {
            codec: "mp3".to_string(),
            bitrate_kbps,
        }
    }
}

/// Everything the provider knows about one video
#[derive(Debug, Clone)]
pub struct ProviderVideo {
    pub id: String,
    pub title: String,
    pub author: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    pub thumbnails: Vec<String>,
    pub renditions: Vec<RawRendition>,
}

/// Unstructured upstream failure. Classified by `diagnostics` before it
/// leaves the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub message: String,
    /// The provider process could not be started at all
    pub not_started: bool,
}

impl ProviderFailure {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            not_started: false,
        }
    }

    pub fn not_started(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            not_started: true,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderFailure {}

/// Opaque extraction/transcoding engine.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Name of the provider (for logging)
    fn name(&self) -> &'static str;

    /// Resolve metadata and the full rendition list
    async fn resolve(
        &self,
        id: &VideoId,
        identity: &ClientIdentity,
    ) -> Result<ProviderVideo, ProviderFailure>;

    /// Fetch one rendition into `destination`
    async fn fetch_rendition(
        &self,
        id: &VideoId,
        selector: &str,
        destination: &Path,
        post: &PostProcess,
        identity: &ClientIdentity,
    ) -> Result<(), ProviderFailure>;
}
