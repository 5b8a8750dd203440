//! Media acquisition orchestrator
//!
//! One call per inbound request: resolve strategies, run them inside a fresh
//! workspace, locate the artifact and hand it out together with the
//! workspace guard. Every failure path closes the workspace before
//! returning.

use crate::downloader::fallback::FallbackExecutor;
use crate::downloader::locator::{locate, ResolvedArtifact};
use crate::downloader::workspace::{Workspace, WorkspaceManager};
use crate::extractor::models::{validate_url, AcquisitionRequest, ExtractionOutcome, VideoInfo};
use crate::extractor::policy::FormatPolicy;
use crate::extractor::traits::ExtractionEngine;
use crate::utils::config::OrchestratorConfig;
use crate::utils::error::AcquireError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// A resolved artifact that still lives in its workspace
///
/// The workspace is removed when this value (or the workspace taken out of
/// it) is dropped, so keep it alive until the file has been sent or copied.
#[derive(Debug)]
pub struct Acquisition {
    artifact: ResolvedArtifact,
    workspace: Workspace,
}

impl Acquisition {
    pub fn artifact(&self) -> &ResolvedArtifact {
        &self.artifact
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn into_parts(self) -> (ResolvedArtifact, Workspace) {
        (self.artifact, self.workspace)
    }

    /// Copy the artifact into `dest_dir`, then remove the workspace.
    pub async fn persist_to(self, dest_dir: &Path) -> Result<PathBuf, AcquireError> {
        let target = dest_dir.join(&self.artifact.filename);
        let copied = async {
            tokio::fs::create_dir_all(dest_dir).await?;
            tokio::fs::copy(&self.artifact.path, &target).await
        }
        .await;

        if let Err(e) = self.workspace.close().await {
            warn!("Workspace cleanup after copy failed: {}", e);
        }
        copied?;
        Ok(target)
    }

    /// Remove the workspace without copying anything out.
    pub async fn release(self) -> std::io::Result<()> {
        self.workspace.close().await
    }
}

pub struct Orchestrator {
    engine: Arc<dyn ExtractionEngine>,
    executor: FallbackExecutor,
    policy: FormatPolicy,
    workspaces: WorkspaceManager,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn ExtractionEngine>, config: &OrchestratorConfig) -> Self {
        Self::with_parts(
            engine,
            FormatPolicy::from_config(config),
            WorkspaceManager::new(&config.workspace_root),
        )
    }

    pub fn with_parts(
        engine: Arc<dyn ExtractionEngine>,
        policy: FormatPolicy,
        workspaces: WorkspaceManager,
    ) -> Self {
        Self {
            executor: FallbackExecutor::new(engine.clone()),
            engine,
            policy,
            workspaces,
        }
    }

    pub fn engine(&self) -> &Arc<dyn ExtractionEngine> {
        &self.engine
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Metadata and format listing for a URL, no download.
    pub async fn probe(&self, url: &str) -> Result<VideoInfo, AcquireError> {
        let url = validate_url(url)?;
        self.engine.probe(&url).await
    }

    /// Acquire the artifact for one request.
    pub async fn acquire(&self, request: &AcquisitionRequest) -> Result<Acquisition, AcquireError> {
        let span = info_span!(
            "acquire",
            url = request.source_url(),
            mode = %request.mode()
        );

        async {
            info!("Starting acquisition via {}", self.engine.id());
            let workspace = self.workspaces.open().await?;

            match self.run(request, &workspace).await {
                Ok(artifact) => Ok(Acquisition {
                    artifact,
                    workspace,
                }),
                Err(e) => {
                    warn!("Acquisition failed ({}): {}", e.kind(), e);
                    if let Err(close_err) = workspace.close().await {
                        warn!("Workspace cleanup failed: {}", close_err);
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Like [`acquire`](Self::acquire), abandoning the work when `cancel`
    /// fires. The in-flight engine process is killed and the workspace
    /// removed.
    pub async fn acquire_with_cancel(
        &self,
        request: &AcquisitionRequest,
        cancel: CancellationToken,
    ) -> Result<Acquisition, AcquireError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Acquisition of {} cancelled", request.source_url());
                Err(AcquireError::Cancelled)
            }
            result = self.acquire(request) => result,
        }
    }

    async fn run(
        &self,
        request: &AcquisitionRequest,
        workspace: &Workspace,
    ) -> Result<ResolvedArtifact, AcquireError> {
        let strategies = self
            .policy
            .resolve(request.mode(), request.quality_hint());
        let execution = self.executor.execute(request, &strategies, workspace).await;

        let success = match execution.outcome {
            ExtractionOutcome::Success(success) => success,
            ExtractionOutcome::Failure {
                classification,
                message,
            } => return Err(AcquireError::from_kind(classification, message)),
        };

        let post_process = execution.strategy.and_then(|s| s.post_process);
        let located = locate(workspace, &success, post_process).await?;
        if let Some(warning) = &located.warning {
            warn!("Artifact location ambiguous: {}", warning);
        }

        info!(
            "Artifact ready: {} ({} bytes) after {} attempt(s)",
            located.artifact.path.display(),
            located.artifact.size,
            execution.attempts
        );
        Ok(located.artifact)
    }
}
