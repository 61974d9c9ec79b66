// FormatSelector - turns provider renditions into a client-facing catalog
//
// Handles:
// - Container filtering (mp4/webm only)
// - Dropping entries without a selector or media URL
// - Combined (audio+video) renditions ahead of split ones
// - Resolution ordering within a class, provider order on ties
// - Separate audio-only list for the audio download path

use lazy_static::lazy_static;
use regex::Regex;

use super::models::{FormatCatalog, RawRendition, RenditionDescriptor};

pub const SUPPORTED_CONTAINERS: [&str; 2] = ["mp4", "webm"];

lazy_static! {
    static ref RESOLUTION_RE: Regex = Regex::new(r"(\d{2,4})p").unwrap();
    static ref BITRATE_RE: Regex = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*k").unwrap();
}

pub struct FormatSelector;

impl FormatSelector {
    /// Build the catalog. Pure: the same input always gives the same output.
    pub fn build_catalog(raw: &[RawRendition]) -> FormatCatalog {
        let eligible: Vec<&RawRendition> = raw.iter().filter(|r| Self::is_eligible(r)).collect();

        let mut formats: Vec<RenditionDescriptor> = eligible
            .iter()
            .filter(|r| r.has_video)
            .map(|r| Self::describe(r))
            .collect();

        let mut audio: Vec<RenditionDescriptor> = eligible
            .iter()
            .filter(|r| r.has_audio && !r.has_video)
            .map(|r| Self::describe(r))
            .collect();

        // sort_by_key is stable, so provider order survives on equal keys
        formats.sort_by_key(|f| {
            (
                std::cmp::Reverse(f.is_combined()),
                std::cmp::Reverse(Self::parse_resolution(&f.quality_label)),
            )
        });
        audio.sort_by_key(|a| std::cmp::Reverse(Self::parse_bitrate(&a.quality_label)));

        FormatCatalog { formats, audio }
    }

    fn is_eligible(r: &RawRendition) -> bool {
        let container_ok = SUPPORTED_CONTAINERS
            .iter()
            .any(|c| r.container.eq_ignore_ascii_case(c));
        let has_url = r.url.as_deref().map_or(false, |u| !u.trim().is_empty());

        container_ok && has_url && !r.selector.trim().is_empty() && (r.has_video || r.has_audio)
    }

    fn describe(r: &RawRendition) -> RenditionDescriptor {
        RenditionDescriptor {
            selector: r.selector.clone(),
            mime_container: r.container.to_ascii_lowercase(),
            quality_label: r.quality_label.clone(),
            has_video_track: r.has_video,
            has_audio_track: r.has_audio,
            mime_type: r.mime_type.clone(),
        }
    }

    /// "1080p60" -> 1080; labels without a resolution rank lowest
    pub fn parse_resolution(label: &str) -> u32 {
        RESOLUTION_RE
            .captures(label)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    }

    /// "128kbps" -> 128, in whole kbps
    pub fn parse_bitrate(label: &str) -> u32 {
        BITRATE_RE
            .captures(label)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f32>().ok())
            .map(|b| b as u32)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendition(selector: &str, container: &str, label: &str, video: bool, audio: bool) -> RawRendition {
        RawRendition {
            selector: selector.to_string(),
            container: container.to_string(),
            quality_label: label.to_string(),
            has_video: video,
            has_audio: audio,
            mime_type: format!(
                "{}/{}",
                if video { "video" } else { "audio" },
                container
            ),
            url: Some(format!("https://cdn.example/{}", selector)),
        }
    }

    #[test]
    fn test_combined_beats_higher_resolution() {
        let raw = vec![
            rendition("137", "mp4", "1080p", true, false),
            rendition("22", "mp4", "720p", true, true),
        ];
        let catalog = FormatSelector::build_catalog(&raw);

        assert_eq!(catalog.formats[0].selector, "22");
        assert_eq!(catalog.formats[1].selector, "137");
    }

    #[test]
    fn test_resolution_order_and_stable_ties() {
        let raw = vec![
            rendition("a", "mp4", "360p", true, true),
            rendition("b", "webm", "720p", true, true),
            rendition("c", "mp4", "720p", true, true),
            rendition("d", "mp4", "1080p60", true, false),
            rendition("e", "webm", "1440p", true, false),
        ];
        let catalog = FormatSelector::build_catalog(&raw);
        let order: Vec<&str> = catalog.formats.iter().map(|f| f.selector.as_str()).collect();

        assert_eq!(order, vec!["b", "c", "a", "e", "d"]);
    }

    #[test]
    fn test_filters_unsupported_and_unresolvable() {
        let mut no_url = rendition("18", "mp4", "360p", true, true);
        no_url.url = None;
        let mut blank_selector = rendition("", "mp4", "480p", true, true);
        blank_selector.selector = "  ".to_string();

        let raw = vec![
            rendition("sb0", "mhtml", "storyboard", true, false),
            rendition("91", "3gp", "144p", true, true),
            no_url,
            blank_selector,
            rendition("22", "MP4", "720p", true, true),
        ];
        let catalog = FormatSelector::build_catalog(&raw);

        assert_eq!(catalog.formats.len(), 1);
        assert_eq!(catalog.formats[0].selector, "22");
        assert_eq!(catalog.formats[0].mime_container, "mp4");
        assert!(catalog.audio.is_empty());
    }

    #[test]
    fn test_audio_listed_separately() {
        let raw = vec![
            rendition("22", "mp4", "720p", true, true),
            rendition("249", "webm", "50kbps", false, true),
            rendition("140", "mp4", "129kbps", false, true),
            rendition("251", "webm", "160kbps", false, true),
        ];
        let catalog = FormatSelector::build_catalog(&raw);

        assert_eq!(catalog.formats.len(), 1);
        let audio: Vec<&str> = catalog.audio.iter().map(|a| a.selector.as_str()).collect();
        assert_eq!(audio, vec!["251", "140", "249"]);
        assert_eq!(catalog.best_audio().map(|a| a.selector.as_str()), Some("251"));
        assert!(catalog.find("140").is_some());
        assert!(catalog.find_audio("22").is_none());
    }

    #[test]
    fn test_idempotent() {
        let raw = vec![
            rendition("137", "mp4", "1080p", true, false),
            rendition("22", "mp4", "720p", true, true),
            rendition("18", "mp4", "360p", true, true),
            rendition("140", "mp4", "128kbps", false, true),
        ];
        let first = FormatSelector::build_catalog(&raw);
        let second = FormatSelector::build_catalog(&raw);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        assert!(FormatSelector::build_catalog(&[]).is_empty());
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!(FormatSelector::parse_resolution("1080p"), 1080);
        assert_eq!(FormatSelector::parse_resolution("720p60 HDR"), 720);
        assert_eq!(FormatSelector::parse_resolution("tiny"), 0);
        assert_eq!(FormatSelector::parse_bitrate("128kbps"), 128);
        assert_eq!(FormatSelector::parse_bitrate("129.5k"), 129);
        assert_eq!(FormatSelector::parse_bitrate("medium"), 0);
    }
}
