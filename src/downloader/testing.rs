// In-memory provider for tests

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::extractors::{ClientIdentity, ExtractionProvider, PostProcess, ProviderFailure, ProviderVideo};
use super::models::{RawRendition, VideoId};

#[derive(Debug, Clone)]
pub enum FetchBehavior {
    Write(Vec<u8>),
    WriteNothing,
    PartialThenFail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub selector: String,
    pub destination: PathBuf,
    pub post: PostProcess,
}

pub struct FakeProvider {
    video: ProviderVideo,
    resolve_error: Option<ProviderFailure>,
    fetch_behavior: FetchBehavior,
    resolve_calls: AtomicUsize,
    fetch_calls: Mutex<Vec<FetchCall>>,
    last_user_agent: Mutex<Option<String>>,
}

pub fn rendition(selector: &str, container: &str, label: &str, video: bool, audio: bool) -> RawRendition {
    RawRendition {
        selector: selector.to_string(),
        container: container.to_string(),
        quality_label: label.to_string(),
        has_video: video,
        has_audio: audio,
        mime_type: format!("{}/{}", if video { "video" } else { "audio" }, container),
        url: Some(format!("https://cdn.example/{}", selector)),
    }
}

impl FakeProvider {
    pub fn sample() -> Self {
        Self::with_renditions(vec![
            rendition("137", "mp4", "1080p", true, false),
            rendition("22", "mp4", "720p", true, true),
            rendition("18", "mp4", "360p", true, true),
            rendition("140", "mp4", "128kbps", false, true),
            rendition("251", "webm", "160kbps", false, true),
        ])
    }

    pub fn with_renditions(renditions: Vec<RawRendition>) -> Self {
        Self {
            video: ProviderVideo {
                id: "dQw4w9WgXcQ".to_string(),
                title: "Test Video".to_string(),
                author: "Test Channel".to_string(),
                duration_seconds: 212,
                view_count: 42,
                thumbnails: vec!["https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string()],
                renditions,
            },
            resolve_error: None,
            fetch_behavior: FetchBehavior::Write(b"media-bytes".to_vec()),
            resolve_calls: AtomicUsize::new(0),
            fetch_calls: Mutex::new(Vec::new()),
            last_user_agent: Mutex::new(None),
        }
    }

    pub fn failing_resolve(message: &str) -> Self {
        let mut fake = Self::sample();
        fake.resolve_error = Some(ProviderFailure::upstream(message));
        fake
    }

    pub fn with_fetch(mut self, behavior: FetchBehavior) -> Self {
        self.fetch_behavior = behavior;
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> Vec<FetchCall> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub fn last_user_agent(&self) -> Option<String> {
        self.last_user_agent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn resolve(
        &self,
        _id: &VideoId,
        identity: &ClientIdentity,
    ) -> Result<ProviderVideo, ProviderFailure> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_agent.lock().unwrap() = Some(identity.user_agent.clone());

        match &self.resolve_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.video.clone()),
        }
    }

    async fn fetch_rendition(
        &self,
        _id: &VideoId,
        selector: &str,
        destination: &Path,
        post: &PostProcess,
        _identity: &ClientIdentity,
    ) -> Result<(), ProviderFailure> {
        self.fetch_calls.lock().unwrap().push(FetchCall {
            selector: selector.to_string(),
            destination: destination.to_path_buf(),
            post: post.clone(),
        });

        match &self.fetch_behavior {
            FetchBehavior::Write(bytes) => {
                std::fs::write(destination, bytes).map_err(|e| ProviderFailure::upstream(e.to_string()))
            }
            FetchBehavior::WriteNothing => Ok(()),
            FetchBehavior::PartialThenFail(message) => {
                let _ = std::fs::write(destination, b"part");
                Err(ProviderFailure::upstream(message.clone()))
            }
        }
    }
}
