// Reference normalization - raw user input to canonical VideoId
//
// The same video is addressable through several URL shapes. Path-style
// links (youtu.be, /shorts/, /embed/) carry the ID in the path and have no
// `v` parameter, so they are matched before falling back to query parsing.

use url::Url;

use super::errors::DownloadError;
use super::models::VideoId;

/// Path markers tried in order; the ID follows the marker.
const PATH_MARKERS: [&str; 3] = ["youtu.be/", "/shorts/", "/embed/"];

/// Normalize a watch URL, short link, shorts/embed link or bare ID.
pub fn normalize(raw: &str) -> Result<VideoId, DownloadError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DownloadError::InvalidReference("empty reference".to_string()));
    }

    if let Some(id) = VideoId::parse(raw) {
        return Ok(id);
    }

    let candidate = PATH_MARKERS
        .iter()
        .find_map(|marker| segment_after(raw, marker))
        .or_else(|| query_param_v(raw));

    candidate
        .as_deref()
        .and_then(VideoId::parse)
        .ok_or_else(|| DownloadError::InvalidReference(raw.to_string()))
}

/// Text right after `marker`, up to the next `?`, `/`, `&` or `#`
fn segment_after(raw: &str, marker: &str) -> Option<String> {
    let start = raw.find(marker)? + marker.len();
    let rest = &raw[start..];
    let end = rest.find(['?', '/', '&', '#']).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

fn query_param_v(raw: &str) -> Option<String> {
    // Accept scheme-less input like "youtube.com/watch?v=..."
    let parsed = Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{}", raw)))
        .ok()?;

    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_all_shapes_normalize_to_same_id() {
        let shapes = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ];
        for shape in shapes {
            assert_eq!(normalize(shape).unwrap().as_str(), ID, "shape: {}", shape);
        }
    }

    #[test]
    fn test_extra_parameters_are_ignored() {
        assert_eq!(
            normalize("https://youtu.be/dQw4w9WgXcQ?si=abcdef&t=42").unwrap().as_str(),
            ID
        );
        assert_eq!(
            normalize("https://www.youtube.com/watch?list=PL123&v=dQw4w9WgXcQ&t=10s")
                .unwrap()
                .as_str(),
            ID
        );
        assert_eq!(
            normalize("https://youtube.com/shorts/dQw4w9WgXcQ/?feature=share").unwrap().as_str(),
            ID
        );
        assert_eq!(normalize("  dQw4w9WgXcQ \n").unwrap().as_str(), ID);
    }

    #[test]
    fn test_scheme_less_watch_url() {
        assert_eq!(normalize("youtube.com/watch?v=dQw4w9WgXcQ").unwrap().as_str(), ID);
        assert_eq!(normalize("m.youtube.com/watch?v=dQw4w9WgXcQ").unwrap().as_str(), ID);
    }

    #[test]
    fn test_invalid_references() {
        for raw in [
            "not a url",
            "",
            "https://www.youtube.com/watch?v=short",
            "https://youtu.be/",
            "https://www.youtube.com/watch?feature=share",
            "https://www.youtube.com/embed/dQw4w9WgXcQQQ",
        ] {
            let err = normalize(raw).unwrap_err();
            assert!(matches!(err, DownloadError::InvalidReference(_)), "input: {:?}", raw);
        }
    }
}
