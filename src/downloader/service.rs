// Service facade used by the host layer
//
// info path:     normalize -> resolve -> build catalog
// download path: canonical id -> orchestrator (re-resolve + fetch)

use std::path::PathBuf;
use std::sync::Arc;

use super::errors::DownloadError;
use super::extractors::{ClientIdentity, ExtractionProvider};
use super::format_selector::FormatSelector;
use super::metadata::MetadataProvider;
use super::models::{
    DownloadRequest, DownloadResult, FormatCatalog, MediaKind, VideoId, VideoMetadata,
};
use super::orchestrator::Downloader;
use super::reference;

/// Result of the info path
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub metadata: VideoMetadata,
    pub catalog: FormatCatalog,
}

pub struct VideoService {
    metadata: MetadataProvider,
    downloader: Downloader,
}

impl VideoService {
    pub fn new(
        provider: Arc<dyn ExtractionProvider>,
        identity: ClientIdentity,
        download_root: PathBuf,
        audio_bitrate_kbps: u32,
    ) -> Self {
        let metadata = MetadataProvider::new(provider, identity);
        let downloader =
            Downloader::new(metadata.clone(), download_root).with_audio_bitrate(audio_bitrate_kbps);
        Self {
            metadata,
            downloader,
        }
    }

    pub async fn video_info(&self, reference: &str) -> Result<VideoInfo, DownloadError> {
        let id = reference::normalize(reference)?;
        let resolved = self.metadata.resolve(&id).await?;
        Ok(VideoInfo {
            catalog: FormatSelector::build_catalog(&resolved.renditions),
            metadata: resolved.metadata,
        })
    }

    pub async fn download_video(
        &self,
        video_id: &str,
        selector: Option<String>,
        title: &str,
    ) -> Result<DownloadResult, DownloadError> {
        let id = Self::canonical(video_id)?;
        let req = DownloadRequest {
            video_id: id,
            selector,
            desired_title: title.to_string(),
            media_kind: MediaKind::Video,
        };
        self.downloader.download(req).await
    }

    pub async fn download_audio(
        &self,
        video_id: &str,
        selector: Option<String>,
        title: &str,
    ) -> Result<DownloadResult, DownloadError> {
        let id = Self::canonical(video_id)?;
        self.downloader
            .download(DownloadRequest::audio(id, title).with_selector(selector))
            .await
    }

    /// Download routes take an already-canonical ID; free text is not normalized
    fn canonical(video_id: &str) -> Result<VideoId, DownloadError> {
        VideoId::parse(video_id.trim())
            .ok_or_else(|| DownloadError::InvalidReference(video_id.to_string()))
    }
}
