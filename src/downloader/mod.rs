// Downloader module - reference resolution and rendition selection pipeline

pub mod diagnostics;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod reference;
pub mod service;
pub mod tools;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use diagnostics::{classify, ClassifiedError};
pub use errors::{DownloadError, ErrorKind};
pub use extractors::{ClientIdentity, CliExtractor, ExtractionProvider};
pub use format_selector::FormatSelector;
pub use metadata::MetadataProvider;
pub use models::{
    DownloadRequest, DownloadResult, FormatCatalog, MediaKind, RenditionDescriptor, SafeFilename,
    VideoId, VideoMetadata,
};
pub use orchestrator::Downloader;
pub use reference::normalize;
pub use service::{VideoInfo, VideoService};
