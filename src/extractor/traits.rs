use crate::downloader::workspace::Workspace;
use crate::extractor::models::{AcquisitionRequest, ExtractionOutcome, StrategyDescriptor, VideoInfo};
use crate::utils::error::AcquireError;
use async_trait::async_trait;

/// Contract with the external extraction engine
///
/// This trait isolates the orchestrator from how extraction actually happens
/// (yt-dlp subprocess, a scripted fake in tests, ...).
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Returns a unique identifier for this engine (e.g., "yt-dlp")
    fn id(&self) -> &'static str;

    /// Run one strategy, writing at most one media file into `workspace`.
    ///
    /// Failures are reported in-band so the fallback executor can decide
    /// whether to continue.
    async fn invoke(
        &self,
        request: &AcquisitionRequest,
        strategy: &StrategyDescriptor,
        workspace: &Workspace,
    ) -> ExtractionOutcome;

    /// List metadata and formats without downloading anything
    async fn probe(&self, url: &str) -> Result<VideoInfo, AcquireError>;
}
