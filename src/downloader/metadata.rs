// Metadata provider adapter
//
// Wraps the opaque extraction provider: injects the configured client
// identity, makes exactly one upstream call per operation and classifies
// every failure before returning it.

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

use super::errors::DownloadError;
use super::extractors::{ClientIdentity, ExtractionProvider, PostProcess};
use super::models::{RawRendition, VideoId, VideoMetadata};

/// Metadata plus the unfiltered rendition list from one resolve call
#[derive(Debug, Clone)]
pub struct ResolvedVideo {
    pub metadata: VideoMetadata,
    pub renditions: Vec<RawRendition>,
}

#[derive(Clone)]
pub struct MetadataProvider {
    provider: Arc<dyn ExtractionProvider>,
    identity: ClientIdentity,
}

impl MetadataProvider {
    pub fn new(provider: Arc<dyn ExtractionProvider>, identity: ClientIdentity) -> Self {
        Self { provider, identity }
    }

    /// Metadata only
    pub async fn fetch_metadata(&self, id: &VideoId) -> Result<VideoMetadata, DownloadError> {
        self.resolve(id).await.map(|r| r.metadata)
    }

    /// Metadata and renditions from a single upstream call
    pub async fn resolve(&self, id: &VideoId) -> Result<ResolvedVideo, DownloadError> {
        let video = self
            .provider
            .resolve(id, &self.identity)
            .await
            .map_err(|failure| {
                let err = DownloadError::from(failure);
                warn!("[Metadata] {} resolve {} failed: {}", self.provider.name(), id, err);
                err
            })?;

        if !video.id.is_empty() && video.id != id.as_str() {
            warn!("[Metadata] provider returned id {} for {}", video.id, id);
        }
        info!("[Metadata] {} \"{}\" by {}", id, video.title, video.author);

        Ok(ResolvedVideo {
            metadata: VideoMetadata {
                id: id.clone(),
                title: video.title,
                author_name: video.author,
                duration_seconds: video.duration_seconds,
                view_count: video.view_count,
                thumbnail_urls: video.thumbnails,
            },
            renditions: video.renditions,
        })
    }

    pub async fn fetch_rendition(
        &self,
        id: &VideoId,
        selector: &str,
        destination: &Path,
        post: &PostProcess,
    ) -> Result<(), DownloadError> {
        self.provider
            .fetch_rendition(id, selector, destination, post, &self.identity)
            .await
            .map_err(|failure| {
                let err = DownloadError::from(failure);
                warn!("[Metadata] {} fetch {} failed: {}", self.provider.name(), id, err);
                err
            })
    }
}
