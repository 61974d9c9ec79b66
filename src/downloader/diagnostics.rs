// Error classification - maps unstructured upstream text onto ErrorKind
//
// The provider reports failures as free text, so classification is a
// case-insensitive containment match over an ordered table. The first row
// with a matching pattern wins; anything unmatched is ProviderRejected.

use serde::Serialize;

use super::errors::{DownloadError, ErrorKind};
use super::extractors::ProviderFailure;

/// Ordered (kind, patterns) table. Patterns are lowercase.
pub const UPSTREAM_PATTERNS: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::RestrictedContent,
        &[
            "sign in to confirm your age",
            "age-restricted",
            "age restricted",
            "inappropriate for some users",
            "private video",
            "video is private",
            "sign in if you've been granted access",
            "members-only",
            "members only",
            "available to members",
            "join this channel",
            "membership",
            "requires payment",
            "requires purchase",
            "youtube premium",
            "drm protected",
            "drm-protected",
            "this video is drm",
        ],
    ),
    (
        ErrorKind::ProviderUnavailable,
        &[
            "timed out",
            "timeout",
            "connection refused",
            "connection reset",
            "network is unreachable",
            "temporary failure in name resolution",
            "name or service not known",
            "failed to resolve",
            "getaddrinfo failed",
            "remote end closed connection",
            "http error 500",
            "http error 502",
            "http error 503",
            "http error 504",
            "internal server error",
            "service unavailable",
            "bad gateway",
        ],
    ),
    (
        ErrorKind::ProviderRejected,
        &[
            "http error 403",
            "forbidden",
            "http error 429",
            "too many requests",
            "not a bot",
            "http error 404",
            "http error 410",
            "video unavailable",
            "not available in your country",
            "requested format is not available",
            "unsupported url",
            "incomplete youtube id",
        ],
    ),
];

/// Classification result handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub user_message: &'static str,
    /// Raw detail for logs; never shown to end users
    #[serde(skip)]
    pub detail: String,
    /// Table pattern that decided the kind, if any
    #[serde(skip)]
    pub matched_pattern: Option<&'static str>,
}

/// Look up upstream text in the pattern table
pub fn match_upstream(text: &str) -> Option<(ErrorKind, &'static str)> {
    let lower = text.to_lowercase();

    UPSTREAM_PATTERNS.iter().find_map(|(kind, patterns)| {
        patterns
            .iter()
            .find(|p| lower.contains(*p))
            .map(|p| (*kind, *p))
    })
}

/// Kind for upstream text; unmatched text is ProviderRejected
pub fn classify_upstream(text: &str) -> ErrorKind {
    match_upstream(text)
        .map(|(kind, _)| kind)
        .unwrap_or(ErrorKind::ProviderRejected)
}

/// Convert a provider failure into the taxonomy at the adapter boundary
pub fn diagnose(failure: &ProviderFailure) -> DownloadError {
    let kind = if failure.not_started {
        ErrorKind::ProviderUnavailable
    } else {
        classify_upstream(&failure.message)
    };
    DownloadError::from_kind(kind, failure.message.clone())
}

impl From<ProviderFailure> for DownloadError {
    fn from(failure: ProviderFailure) -> Self {
        diagnose(&failure)
    }
}

/// Full classification of a pipeline error
pub fn classify(err: &DownloadError) -> ClassifiedError {
    let kind = err.kind();
    let matched_pattern = if kind.is_upstream() {
        match_upstream(err.detail())
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p)
    } else {
        None
    };

    ClassifiedError {
        kind,
        user_message: kind.user_message(),
        detail: err.detail().to_string(),
        matched_pattern,
    }
}
