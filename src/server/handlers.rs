use std::path::PathBuf;

use actix_web::{http::header, http::StatusCode, web, HttpResponse};
use async_stream::stream;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::downloader::{classify, DownloadError, DownloadResult, RenditionDescriptor, VideoInfo};
use crate::server::state::AppState;

#[derive(Deserialize)]
pub struct InfoQuery {
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub video_id: Option<String>,
    pub itag: Option<String>,
    pub title: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoInfoResponse {
    video_details: VideoDetails,
    formats: Vec<FormatEntry>,
    audio_formats: Vec<FormatEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    video_id: String,
    title: String,
    author: Author,
    length_seconds: u64,
    view_count: u64,
    thumbnails: Vec<Thumbnail>,
}

#[derive(Serialize)]
struct Author {
    name: String,
}

#[derive(Serialize)]
struct Thumbnail {
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormatEntry {
    itag: String,
    mime_type: String,
    quality_label: String,
    has_audio: bool,
    has_video: bool,
    container: String,
}

impl From<&RenditionDescriptor> for FormatEntry {
    fn from(r: &RenditionDescriptor) -> Self {
        Self {
            itag: r.selector.clone(),
            mime_type: r.mime_type.clone(),
            quality_label: r.quality_label.clone(),
            has_audio: r.has_audio_track,
            has_video: r.has_video_track,
            container: r.mime_container.clone(),
        }
    }
}

impl From<VideoInfo> for VideoInfoResponse {
    fn from(info: VideoInfo) -> Self {
        let meta = info.metadata;
        Self {
            video_details: VideoDetails {
                video_id: meta.id.to_string(),
                title: meta.title,
                author: Author {
                    name: meta.author_name,
                },
                length_seconds: meta.duration_seconds,
                view_count: meta.view_count,
                thumbnails: meta
                    .thumbnail_urls
                    .into_iter()
                    .map(|url| Thumbnail { url })
                    .collect(),
            },
            formats: info.catalog.formats.iter().map(FormatEntry::from).collect(),
            audio_formats: info.catalog.audio.iter().map(FormatEntry::from).collect(),
        }
    }
}

/// Structured `{error, kind}` body; upstream detail only goes to the log
fn error_response(err: &DownloadError) -> HttpResponse {
    let classified = classify(err);
    warn!(
        "[API] {} ({}): {}",
        classified.kind,
        classified.matched_pattern.unwrap_or("no pattern"),
        classified.detail
    );

    let status = StatusCode::from_u16(classified.kind.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(serde_json::json!({
        "error": classified.user_message,
        "kind": classified.kind,
    }))
}

/// Removes the served file once the response body is finished or dropped
struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("[API] failed to remove {}: {}", self.0.display(), e);
            }
        }
    }
}

async fn file_response(result: DownloadResult) -> HttpResponse {
    let meta = match tokio::fs::metadata(&result.file_path).await {
        Ok(m) => m,
        Err(e) => return error_response(&DownloadError::storage("stat finished download", e)),
    };

    let file_name = result.file_name();
    let path = result.file_path.clone();
    info!("[API] streaming {} ({} bytes)", path.display(), meta.len());

    let body = stream! {
        let _cleanup = RemoveOnDrop(path.clone());

        let mut file = match File::open(&path).await {
            Ok(f) => f,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            match file.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => yield Ok(bytes::Bytes::copy_from_slice(&buffer[..n])),
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    // Sized body: clients get Content-Length instead of chunked encoding
    HttpResponse::Ok()
        .no_chunking(meta.len())
        .content_type(result.media_kind.content_type())
        .append_header((
            header::CONTENT_DISPOSITION,
            format!(r#"attachment; filename="{}""#, file_name),
        ))
        .append_header((header::CACHE_CONTROL, "no-store"))
        .streaming(body)
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "ytserve",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /api/health": "Health check",
            "GET /api/videoInfo?url=": "Video details and available formats",
            "GET /api/download?videoId=&itag=&title=": "Download one video format as mp4",
            "GET /api/audio?videoId=&title=": "Download audio as mp3"
        }
    }))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub async fn video_info(query: web::Query<InfoQuery>, state: web::Data<AppState>) -> HttpResponse {
    let reference = query.url.as_deref().unwrap_or_default();
    info!("[API] videoInfo: {}", reference);

    match state.service.video_info(reference).await {
        Ok(info) => HttpResponse::Ok()
            .append_header((header::CACHE_CONTROL, "no-store"))
            .json(VideoInfoResponse::from(info)),
        Err(e) => error_response(&e),
    }
}

pub async fn download(query: web::Query<DownloadQuery>, state: web::Data<AppState>) -> HttpResponse {
    let query = query.into_inner();
    let video_id = query.video_id.unwrap_or_default();
    let title = query.title.unwrap_or_else(|| "video".to_string());
    info!("[API] download: id={} itag={:?}", video_id, query.itag);

    match state.service.download_video(&video_id, query.itag, &title).await {
        Ok(result) => file_response(result).await,
        Err(e) => error_response(&e),
    }
}

pub async fn audio(query: web::Query<DownloadQuery>, state: web::Data<AppState>) -> HttpResponse {
    let query = query.into_inner();
    let video_id = query.video_id.unwrap_or_default();
    let title = query.title.unwrap_or_else(|| "audio".to_string());
    info!("[API] audio: id={}", video_id);

    match state.service.download_audio(&video_id, query.itag, &title).await {
        Ok(result) => file_response(result).await,
        Err(e) => error_response(&e),
    }
}
