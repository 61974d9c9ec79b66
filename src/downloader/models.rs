// Common data models for the resolution pipeline

use std::fmt;
use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

/// Upper bound for a sanitized base name, in characters.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Canonical 11-character video identifier.
///
/// Only constructible through [`VideoId::parse`], so holding one means the
/// pattern has already been checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(candidate: &str) -> Option<Self> {
        if Self::is_canonical(candidate) {
            Some(Self(candidate.to_string()))
        } else {
            None
        }
    }

    pub fn is_canonical(candidate: &str) -> bool {
        VIDEO_ID_RE.is_match(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Watch URL handed to the extraction provider
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Video details returned on the info path. Never cached.
#[derive(Debug, Clone, Serialize)]
pub struct VideoMetadata {
    pub id: VideoId,
    pub title: String,
    pub author_name: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    pub thumbnail_urls: Vec<String>,
}

/// Rendition record as reported by the provider, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRendition {
    /// Opaque provider key (itag / format_id)
    pub selector: String,
    /// Container name (mp4, webm, ...)
    pub container: String,
    /// e.g. "720p", "1080p60", "128kbps"
    pub quality_label: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub mime_type: String,
    /// Direct media URL, absent for manifest-only entries
    pub url: Option<String>,
}

/// Client-facing rendition entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenditionDescriptor {
    pub selector: String,
    pub mime_container: String,
    pub quality_label: String,
    pub has_video_track: bool,
    pub has_audio_track: bool,
    pub mime_type: String,
}

impl RenditionDescriptor {
    pub fn is_combined(&self) -> bool {
        self.has_video_track && self.has_audio_track
    }
}

/// Filtered, ranked renditions for one video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatCatalog {
    /// Renditions with a video track, best first
    pub formats: Vec<RenditionDescriptor>,
    /// Audio-only renditions, highest bitrate first
    pub audio: Vec<RenditionDescriptor>,
}

impl FormatCatalog {
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty() && self.audio.is_empty()
    }

    /// Look up a rendition by selector in either list
    pub fn find(&self, selector: &str) -> Option<&RenditionDescriptor> {
        self.formats
            .iter()
            .chain(self.audio.iter())
            .find(|r| r.selector == selector)
    }

    pub fn find_audio(&self, selector: &str) -> Option<&RenditionDescriptor> {
        self.audio.iter().find(|r| r.selector == selector)
    }

    pub fn best_audio(&self) -> Option<&RenditionDescriptor> {
        self.audio.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "mp3",
        }
    }

    pub fn default_base_name(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Video => "video/mp4",
            Self::Audio => "audio/mpeg",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_base_name())
    }
}

/// Sanitized base name (without extension) safe to join onto the download root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeFilename(String);

impl SafeFilename {
    /// Build a base name from an untrusted title.
    ///
    /// Characters outside `[A-Za-z0-9 \-_.()]` become `_`. Leading dots are
    /// replaced too, which rules out `.`, `..` and hidden files. A result with
    /// no alphanumeric character falls back to the kind's default name.
    pub fn from_title(title: &str, kind: MediaKind) -> Self {
        let mapped: String = title
            .chars()
            .map(|c| if Self::is_allowed(c) { c } else { '_' })
            .collect();

        // Trim before the dot guard so whitespace cannot hide a leading dot
        let trimmed = mapped.trim();
        let leading_dots = trimmed.chars().take_while(|c| *c == '.').count();
        let guarded = format!("{}{}", "_".repeat(leading_dots), &trimmed[leading_dots..]);

        let truncated: String = guarded.chars().take(MAX_FILENAME_CHARS).collect();
        let truncated = truncated.trim_end().to_string();

        if !truncated.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Self(kind.default_base_name().to_string());
        }
        Self(truncated)
    }

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn with_extension(&self, kind: MediaKind) -> String {
        format!("{}.{}", self.0, kind.extension())
    }
}

/// Parameters for one download. `selector` is required for video.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub video_id: VideoId,
    pub selector: Option<String>,
    pub desired_title: String,
    pub media_kind: MediaKind,
}

impl DownloadRequest {
    pub fn video(video_id: VideoId, selector: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            video_id,
            selector: Some(selector.into()),
            desired_title: title.into(),
            media_kind: MediaKind::Video,
        }
    }

    pub fn audio(video_id: VideoId, title: impl Into<String>) -> Self {
        Self {
            video_id,
            selector: None,
            desired_title: title.into(),
            media_kind: MediaKind::Audio,
        }
    }

    pub fn with_selector(mut self, selector: Option<String>) -> Self {
        self.selector = selector;
        self
    }
}

/// A completed file ready to be streamed back by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub file_path: PathBuf,
    pub media_kind: MediaKind,
}

impl DownloadResult {
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.media_kind.default_base_name().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_pattern() {
        assert!(VideoId::parse("dQw4w9WgXcQ").is_some());
        assert!(VideoId::parse("a-b_c-d_e-f").is_some());
        assert!(VideoId::parse("dQw4w9WgXc").is_none());
        assert!(VideoId::parse("dQw4w9WgXcQQ").is_none());
        assert!(VideoId::parse("dQw4w9WgXc!").is_none());
    }

    #[test]
    fn test_sanitize_replaces_punctuation() {
        let name = SafeFilename::from_title("My Video! #1 (HD)", MediaKind::Video);
        assert_eq!(name.as_str(), "My Video_ _1 (HD)");
        assert!(name
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " -_.()".contains(c)));
    }

    #[test]
    fn test_sanitize_falls_back_to_default() {
        assert_eq!(SafeFilename::from_title("", MediaKind::Video).as_str(), "video");
        assert_eq!(SafeFilename::from_title("!!!???", MediaKind::Audio).as_str(), "audio");
        assert_eq!(SafeFilename::from_title("   ", MediaKind::Audio).as_str(), "audio");
    }

    #[test]
    fn test_sanitize_blocks_traversal() {
        let name = SafeFilename::from_title("../../etc/passwd", MediaKind::Video);
        assert!(!name.as_str().contains('/'));
        assert!(!name.as_str().starts_with('.'));

        let name = SafeFilename::from_title("..\\secret", MediaKind::Video);
        assert!(!name.as_str().contains('\\'));
        assert!(!name.as_str().starts_with('.'));

        assert_eq!(SafeFilename::from_title("..", MediaKind::Video).as_str(), "video");

        for title in [" .bashrc", "\t..hidden", "  . profile"] {
            let name = SafeFilename::from_title(title, MediaKind::Video);
            assert!(
                !name.as_str().starts_with('.'),
                "{:?} sanitized to {:?}",
                title,
                name.as_str()
            );
        }
        assert_eq!(SafeFilename::from_title(" .bashrc", MediaKind::Video).as_str(), "_bashrc");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(500);
        let name = SafeFilename::from_title(&long, MediaKind::Video);
        assert_eq!(name.as_str().chars().count(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_sanitize_non_ascii() {
        let name = SafeFilename::from_title("Café über", MediaKind::Audio);
        assert_eq!(name.as_str(), "Caf_ _ber");
        assert_eq!(name.with_extension(MediaKind::Audio), "Caf_ _ber.mp3");
    }
}
