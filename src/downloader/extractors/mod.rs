// Extraction providers
//
// The pipeline only talks to `ExtractionProvider`; `CliExtractor` is the
// production backend built on the yt-dlp binary.

mod cli;
mod traits;

pub use cli::CliExtractor;
pub use traits::{
    ClientIdentity, ExtractionProvider, PostProcess, ProviderFailure, ProviderVideo,
    DEFAULT_USER_AGENT,
};
