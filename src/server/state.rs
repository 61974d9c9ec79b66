use std::sync::Arc;

use crate::downloader::VideoService;

/// Shared read-only state; nothing in here is mutated after startup.
pub struct AppState {
    pub service: Arc<VideoService>,
}
