// Download orchestrator - re-resolve a rendition and fetch it to disk

use log::{info, warn};
use std::path::{Path, PathBuf};

use super::errors::DownloadError;
use super::extractors::PostProcess;
use super::format_selector::FormatSelector;
use super::metadata::MetadataProvider;
use super::models::{DownloadRequest, DownloadResult, MediaKind, SafeFilename};
use super::utils::remove_partial;

pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 192;

pub struct Downloader {
    metadata: MetadataProvider,
    download_root: PathBuf,
    audio_bitrate_kbps: u32,
}

impl Downloader {
    pub fn new(metadata: MetadataProvider, download_root: PathBuf) -> Self {
        Self {
            metadata,
            download_root,
            audio_bitrate_kbps: DEFAULT_AUDIO_BITRATE_KBPS,
        }
    }

    pub fn with_audio_bitrate(mut self, kbps: u32) -> Self {
        self.audio_bitrate_kbps = kbps;
        self
    }

    /// Create the download root once at startup
    pub fn prepare_root(root: &Path) -> Result<(), DownloadError> {
        std::fs::create_dir_all(root)
            .map_err(|e| DownloadError::storage(&format!("create {}", root.display()), e))
    }

    /// `<root>/<sanitized title>.<mp4|mp3>`
    pub fn destination_for(&self, title: &str, kind: MediaKind) -> PathBuf {
        let name = SafeFilename::from_title(title, kind);
        self.download_root.join(name.with_extension(kind))
    }

    pub async fn download(&self, req: DownloadRequest) -> Result<DownloadResult, DownloadError> {
        let selector = req
            .selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        if req.media_kind == MediaKind::Video && selector.is_none() {
            return Err(DownloadError::InvalidRequest(
                "selector is required for video downloads".to_string(),
            ));
        }

        let destination = self.destination_for(&req.desired_title, req.media_kind);

        let resolved = self.metadata.resolve(&req.video_id).await?;
        let catalog = FormatSelector::build_catalog(&resolved.renditions);

        let rendition = match req.media_kind {
            MediaKind::Video => selector.and_then(|s| catalog.find(s)),
            MediaKind::Audio => match selector {
                Some(s) => catalog.find_audio(s),
                None => catalog.best_audio(),
            },
        }
        .cloned()
        .ok_or_else(|| {
            DownloadError::SelectorNotFound(format!(
                "{} {} for {}",
                req.media_kind,
                selector.unwrap_or("<best audio>"),
                req.video_id
            ))
        })?;

        let post = self.post_process_for(req.media_kind);
        info!(
            "[Downloader] {} {} format {} ({}) -> {}",
            req.media_kind,
            req.video_id,
            rendition.selector,
            rendition.quality_label,
            destination.display()
        );

        if let Err(err) = self
            .metadata
            .fetch_rendition(&req.video_id, &rendition.selector, &destination, &post)
            .await
        {
            self.discard(&destination).await;
            return Err(err);
        }

        if let Err(err) = Self::verify_output(&destination).await {
            self.discard(&destination).await;
            return Err(err);
        }

        info!("[Downloader] ✓ {}", destination.display());
        Ok(DownloadResult {
            file_path: destination,
            media_kind: req.media_kind,
        })
    }

    /// Catalog audio is always mp4/webm, so audio is always transcoded
    fn post_process_for(&self, kind: MediaKind) -> PostProcess {
        match kind {
            MediaKind::Video => PostProcess::None,
            MediaKind::Audio => PostProcess::mp3(self.audio_bitrate_kbps),
        }
    }

    async fn verify_output(destination: &Path) -> Result<(), DownloadError> {
        let meta = tokio::fs::metadata(destination).await.map_err(|e| {
            DownloadError::storage(
                &format!("provider finished but {} is missing", destination.display()),
                e,
            )
        })?;

        if meta.len() == 0 {
            return Err(DownloadError::StorageError(format!(
                "provider finished but {} is empty",
                destination.display()
            )));
        }
        Ok(())
    }

    async fn discard(&self, destination: &Path) {
        if let Err(e) = remove_partial(destination).await {
            warn!(
                "[Downloader] could not remove partial file {}: {}",
                destination.display(),
                e
            );
        }
    }
}
