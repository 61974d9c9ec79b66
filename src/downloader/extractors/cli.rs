// CLI provider - drives the native `yt-dlp` binary
//
// resolve:         yt-dlp --dump-json <watch url>
// fetch_rendition: yt-dlp -f <selector> -o <destination> <watch url>
//                  (+ -x --audio-format for audio extraction via ffmpeg)

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::traits::{ClientIdentity, ExtractionProvider, PostProcess, ProviderFailure, ProviderVideo};
use crate::downloader::format_selector::FormatSelector;
use crate::downloader::models::{RawRendition, VideoId};
use crate::downloader::utils::{remove_template_outputs, run_output, stderr_tail};

const STDERR_TAIL_LINES: usize = 20;

/// yt-dlp backed provider
pub struct CliExtractor {
    ytdlp_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
    proxy: Option<String>,
    socket_timeout_secs: u32,
    env_path: Option<String>,
}

impl CliExtractor {
    pub fn new(ytdlp_path: PathBuf) -> Self {
        Self {
            ytdlp_path,
            ffmpeg_path: None,
            proxy: None,
            socket_timeout_secs: 30,
            env_path: None,
        }
    }

    pub fn with_ffmpeg(mut self, ffmpeg_path: Option<PathBuf>) -> Self {
        self.ffmpeg_path = ffmpeg_path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_socket_timeout(mut self, seconds: u32) -> Self {
        self.socket_timeout_secs = seconds;
        self
    }

    /// `PATH` for the child process (yt-dlp looks up ffmpeg/node through it)
    pub fn with_env_path(mut self, env_path: Option<String>) -> Self {
        self.env_path = env_path;
        self
    }

    /// Flags shared by every invocation
    fn common_args(&self, identity: &ClientIdentity) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-cache-dir".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            "--user-agent".to_string(),
            identity.user_agent.clone(),
        ];

        if let Some(path) = &identity.cookie_context {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        if let Some(ffmpeg) = &self.ffmpeg_path {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().to_string());
        }

        args
    }

    fn build_resolve_args(&self, id: &VideoId, identity: &ClientIdentity) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string(), "--skip-download".to_string()];
        args.extend(self.common_args(identity));
        args.push(id.watch_url());
        args
    }

    fn build_fetch_args(
        &self,
        id: &VideoId,
        selector: &str,
        destination: &Path,
        post: &PostProcess,
        identity: &ClientIdentity,
    ) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            selector.to_string(),
            "--no-part".to_string(),
            "--force-overwrites".to_string(),
        ];
        args.extend(self.common_args(identity));

        match post {
            PostProcess::ExtractAudio { codec, bitrate_kbps } => {
                // yt-dlp names the extracted file itself; the template keeps the stem
                args.push("-o".to_string());
                args.push(Self::ext_template(destination));
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
                args.push("--audio-quality".to_string());
                args.push(format!("{}K", bitrate_kbps));
            }
            PostProcess::None if self.ffmpeg_path.is_some() && Self::wants_mp4(destination) => {
                // webm sources are remuxed so the output always lands at <stem>.mp4
                args.push("-o".to_string());
                args.push(Self::ext_template(destination));
                args.push("--remux-video".to_string());
                args.push("mp4".to_string());
            }
            PostProcess::None => {
                args.push("-o".to_string());
                args.push(destination.to_string_lossy().to_string());
            }
        }

        args.push(id.watch_url());
        args
    }

    fn wants_mp4(destination: &Path) -> bool {
        destination
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case("mp4"))
    }

    /// "/root/Title.mp3" -> "/root/Title.%(ext)s"
    fn ext_template(destination: &Path) -> String {
        destination
            .with_extension("%(ext)s")
            .to_string_lossy()
            .to_string()
    }

    fn parse_json(stdout: &[u8]) -> Result<ProviderVideo, ProviderFailure> {
        let json: Value = serde_json::from_slice(stdout)
            .map_err(|e| ProviderFailure::upstream(format!("Failed to parse yt-dlp JSON: {}", e)))?;

        let thumbnails: Vec<String> = json["thumbnails"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t["url"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .filter(|v: &Vec<String>| !v.is_empty())
            .or_else(|| json["thumbnail"].as_str().map(|t| vec![t.to_string()]))
            .unwrap_or_default();

        let author = json["uploader"]
            .as_str()
            .or_else(|| json["channel"].as_str())
            .unwrap_or("Unknown")
            .to_string();

        Ok(ProviderVideo {
            id: json["id"].as_str().unwrap_or_default().to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            author,
            duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
            view_count: json["view_count"].as_u64().unwrap_or(0),
            thumbnails,
            renditions: Self::parse_formats(&json),
        })
    }

    fn parse_formats(json: &Value) -> Vec<RawRendition> {
        let Some(formats) = json["formats"].as_array() else {
            return Vec::new();
        };

        formats
            .iter()
            .map(|f| {
                let vcodec = f["vcodec"].as_str().filter(|v| *v != "none");
                let acodec = f["acodec"].as_str().filter(|a| *a != "none");
                let has_video = vcodec.is_some();
                let has_audio = acodec.is_some();
                let ext = f["ext"].as_str().unwrap_or_default();
                let container = Self::container_for_ext(ext);

                let codecs: Vec<&str> = vcodec.into_iter().chain(acodec).collect();
                let major = if has_video { "video" } else { "audio" };
                let mime_type = if codecs.is_empty() {
                    format!("{}/{}", major, container)
                } else {
                    format!("{}/{}; codecs=\"{}\"", major, container, codecs.join(", "))
                };

                RawRendition {
                    selector: f["format_id"].as_str().unwrap_or_default().to_string(),
                    quality_label: Self::quality_label(f, has_video),
                    container,
                    has_video,
                    has_audio,
                    mime_type,
                    url: f["url"].as_str().map(str::to_string),
                }
            })
            .collect()
    }

    /// m4a is an mp4 container; everything else maps to itself
    fn container_for_ext(ext: &str) -> String {
        match ext.to_ascii_lowercase().as_str() {
            "m4a" | "m4v" => "mp4".to_string(),
            "weba" => "webm".to_string(),
            other => other.to_string(),
        }
    }

    fn quality_label(f: &Value, has_video: bool) -> String {
        let note = f["format_note"].as_str().unwrap_or_default();

        if has_video {
            if FormatSelector::parse_resolution(note) > 0 {
                return note.to_string();
            }
            if let Some(height) = f["height"].as_u64() {
                return format!("{}p", height);
            }
        } else if let Some(abr) = f["abr"].as_f64() {
            return format!("{}kbps", abr.round() as u64);
        }

        if !note.is_empty() {
            return note.to_string();
        }
        f["resolution"].as_str().unwrap_or_default().to_string()
    }
}

#[async_trait]
impl ExtractionProvider for CliExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn resolve(
        &self,
        id: &VideoId,
        identity: &ClientIdentity,
    ) -> Result<ProviderVideo, ProviderFailure> {
        let args = self.build_resolve_args(id, identity);
        debug!("[CliExtractor] resolve {}", id);

        let output = run_output(&self.ytdlp_path, &args, self.env_path.as_deref())
            .await
            .map_err(|e| {
                ProviderFailure::not_started(format!(
                    "Failed to start {}: {}",
                    self.ytdlp_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let tail = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
            warn!("[CliExtractor] resolve {} failed ({}): {}", id, output.status, tail);
            return Err(ProviderFailure::upstream(tail));
        }

        let video = Self::parse_json(&output.stdout)?;
        info!(
            "[CliExtractor] resolved {} with {} renditions",
            id,
            video.renditions.len()
        );
        Ok(video)
    }

    async fn fetch_rendition(
        &self,
        id: &VideoId,
        selector: &str,
        destination: &Path,
        post: &PostProcess,
        identity: &ClientIdentity,
    ) -> Result<(), ProviderFailure> {
        let args = self.build_fetch_args(id, selector, destination, post, identity);
        info!(
            "[CliExtractor] fetching {} format {} -> {}",
            id,
            selector,
            destination.display()
        );

        let output = run_output(&self.ytdlp_path, &args, self.env_path.as_deref())
            .await
            .map_err(|e| {
                ProviderFailure::not_started(format!(
                    "Failed to start {}: {}",
                    self.ytdlp_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let tail = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
            warn!("[CliExtractor] fetch {} failed ({}): {}", id, output.status, tail);
            // Template outputs land next to the destination under other extensions
            match remove_template_outputs(destination).await {
                Ok(0) => {}
                Ok(n) => debug!("[CliExtractor] removed {} leftover file(s) for {}", n, id),
                Err(e) => warn!("[CliExtractor] cleanup after failed fetch: {}", e),
            }
            return Err(ProviderFailure::upstream(tail));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Never Gonna Give You Up",
        "uploader": "Rick Astley",
        "duration": 212.0,
        "view_count": 1500000000,
        "thumbnails": [
            {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg"},
            {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"}
        ],
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none", "format_note": "storyboard", "url": "https://x/sb"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.478, "url": "https://x/140"},
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360, "format_note": "360p", "url": "https://x/18"},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "height": 1080, "format_note": "1080p", "url": "https://x/137"},
            {"format_id": "248", "ext": "webm", "vcodec": "vp9", "acodec": "none", "height": 1080, "format_note": "Premium"}
        ]
    }"#;

    fn identity() -> ClientIdentity {
        ClientIdentity::default().with_cookie_context(Some(PathBuf::from("/tmp/cookies.txt")))
    }

    #[test]
    fn test_parse_json_metadata() {
        let video = CliExtractor::parse_json(SAMPLE.as_bytes()).unwrap();
        assert_eq!(video.id, "dQw4w9WgXcQ");
        assert_eq!(video.author, "Rick Astley");
        assert_eq!(video.duration_seconds, 212);
        assert_eq!(video.view_count, 1_500_000_000);
        assert_eq!(video.thumbnails.len(), 2);
        assert_eq!(video.renditions.len(), 5);
    }

    #[test]
    fn test_parse_formats() {
        let video = CliExtractor::parse_json(SAMPLE.as_bytes()).unwrap();
        let by_id = |id: &str| video.renditions.iter().find(|r| r.selector == id).unwrap();

        let audio = by_id("140");
        assert_eq!(audio.container, "mp4");
        assert_eq!(audio.quality_label, "129kbps");
        assert!(audio.has_audio && !audio.has_video);
        assert!(audio.mime_type.starts_with("audio/mp4"));

        let combined = by_id("18");
        assert!(combined.has_audio && combined.has_video);
        assert_eq!(combined.quality_label, "360p");
        assert_eq!(combined.mime_type, "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"");

        // format_note without a resolution falls back to height
        assert_eq!(by_id("248").quality_label, "1080p");
        assert_eq!(by_id("248").url, None);
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        let err = CliExtractor::parse_json(b"not json").unwrap_err();
        assert!(err.message.contains("Failed to parse yt-dlp JSON"));
        assert!(!err.not_started);
    }

    #[test]
    fn test_resolve_args_carry_identity() {
        let cli = CliExtractor::new(PathBuf::from("yt-dlp")).with_proxy(Some("socks5://127.0.0.1:1080".to_string()));
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let args = cli.build_resolve_args(&id, &identity());

        assert!(args.contains(&"--dump-json".to_string()));
        let ua = args.iter().position(|a| a == "--user-agent").unwrap();
        assert!(args[ua + 1].starts_with("Mozilla/5.0"));
        let cookies = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[cookies + 1], "/tmp/cookies.txt");
        assert!(args.contains(&"socks5://127.0.0.1:1080".to_string()));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_fetch_args_audio_extraction() {
        let cli = CliExtractor::new(PathBuf::from("yt-dlp"));
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let args = cli.build_fetch_args(
            &id,
            "140",
            Path::new("/srv/downloads/Song.mp3"),
            &PostProcess::mp3(192),
            &identity(),
        );

        assert!(args.contains(&"-x".to_string()));
        assert!(args.contains(&"192K".to_string()));
        let out = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[out + 1], "/srv/downloads/Song.%(ext)s");
    }

    #[test]
    fn test_fetch_args_video() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let dest = Path::new("/srv/downloads/Test.mp4");

        let plain = CliExtractor::new(PathBuf::from("yt-dlp"));
        let args = plain.build_fetch_args(&id, "22", dest, &PostProcess::None, &identity());
        let out = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[out + 1], "/srv/downloads/Test.mp4");
        assert!(!args.contains(&"--remux-video".to_string()));

        let remuxing = CliExtractor::new(PathBuf::from("yt-dlp"))
            .with_ffmpeg(Some(PathBuf::from("/usr/bin/ffmpeg")));
        let args = remuxing.build_fetch_args(&id, "22", dest, &PostProcess::None, &identity());
        assert!(args.contains(&"--remux-video".to_string()));
        assert!(args.contains(&"/srv/downloads/Test.%(ext)s".to_string()));
    }
}
