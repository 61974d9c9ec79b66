// Error taxonomy for the resolution pipeline

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable error kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input could not be normalized into a video ID
    InvalidReference,
    /// Request shape is wrong (e.g. missing selector)
    InvalidRequest,
    /// No rendition matches the requested selector
    SelectorNotFound,
    /// Upstream refused the request (4xx-equivalent, or unrecognized)
    ProviderRejected,
    /// Upstream or network is down (5xx-equivalent)
    ProviderUnavailable,
    /// Age-gated, members-only, private or paid content
    RestrictedContent,
    /// Destination could not be written
    StorageError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        Self::InvalidReference,
        Self::InvalidRequest,
        Self::SelectorNotFound,
        Self::ProviderRejected,
        Self::ProviderUnavailable,
        Self::RestrictedContent,
        Self::StorageError,
    ];

    /// Fixed user-facing message. Never includes upstream text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidReference => {
                "That doesn't look like a valid video link or ID. Paste a watch, youtu.be, shorts or embed URL."
            }
            Self::InvalidRequest => "The request is missing required parameters.",
            Self::SelectorNotFound => {
                "The selected format is no longer available for this video. Refresh the format list and try again."
            }
            Self::ProviderRejected => "The video service rejected the request. Try again later.",
            Self::ProviderUnavailable => {
                "The video service is unreachable right now. Check the connection and try again later."
            }
            Self::RestrictedContent => {
                "This video is restricted (age, membership or private) and cannot be downloaded."
            }
            Self::StorageError => "The file could not be saved on the server.",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidReference | Self::InvalidRequest => 400,
            Self::SelectorNotFound => 404,
            Self::ProviderRejected => 502,
            Self::ProviderUnavailable => 503,
            Self::RestrictedContent => 403,
            Self::StorageError => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidReference => "invalid_reference",
            Self::InvalidRequest => "invalid_request",
            Self::SelectorNotFound => "selector_not_found",
            Self::ProviderRejected => "provider_rejected",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::RestrictedContent => "restricted_content",
            Self::StorageError => "storage_error",
        }
    }

    /// Kinds that originate from the extraction provider
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::ProviderRejected | Self::ProviderUnavailable | Self::RestrictedContent
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by every pipeline operation. The payload is diagnostic
/// detail for logs, not for end users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Restricted content: {0}")]
    RestrictedContent(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidReference(_) => ErrorKind::InvalidReference,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::SelectorNotFound(_) => ErrorKind::SelectorNotFound,
            Self::ProviderRejected(_) => ErrorKind::ProviderRejected,
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::RestrictedContent(_) => ErrorKind::RestrictedContent,
            Self::StorageError(_) => ErrorKind::StorageError,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidReference(s)
            | Self::InvalidRequest(s)
            | Self::SelectorNotFound(s)
            | Self::ProviderRejected(s)
            | Self::ProviderUnavailable(s)
            | Self::RestrictedContent(s)
            | Self::StorageError(s) => s,
        }
    }

    pub fn from_kind(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match kind {
            ErrorKind::InvalidReference => Self::InvalidReference(detail),
            ErrorKind::InvalidRequest => Self::InvalidRequest(detail),
            ErrorKind::SelectorNotFound => Self::SelectorNotFound(detail),
            ErrorKind::ProviderRejected => Self::ProviderRejected(detail),
            ErrorKind::ProviderUnavailable => Self::ProviderUnavailable(detail),
            ErrorKind::RestrictedContent => Self::RestrictedContent(detail),
            ErrorKind::StorageError => Self::StorageError(detail),
        }
    }

    pub fn storage(context: &str, err: std::io::Error) -> Self {
        Self::StorageError(format!("{}: {}", context, err))
    }
}
