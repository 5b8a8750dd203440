//! Mediadrop library
//!
//! Turns a media URL into one finished file on local disk by driving
//! yt-dlp through an ordered list of format strategies inside a
//! per-request workspace.

pub mod downloader;
pub mod extractor;
pub mod server;
pub mod utils;

// Re-export main types for easier use
pub use downloader::{Acquisition, Orchestrator, ResolvedArtifact, Workspace, WorkspaceManager};
pub use extractor::{
    AcquisitionRequest, ExtractionEngine, ExtractionOutcome, FormatPolicy, Mode, QualityHint,
    StrategyDescriptor, VideoInfo, YtDlpEngine,
};
pub use utils::{AcquireError, FailureKind, OrchestratorConfig};
