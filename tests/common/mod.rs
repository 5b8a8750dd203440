//! Scripted extraction engine shared by the integration tests.
//!
//! Each invocation pops the next step, drops an `attempt-N.part` file into
//! the workspace (like a real interrupted transfer would) and then acts.

#![allow(dead_code)]

use async_trait::async_trait;
use mediadrop::downloader::Workspace;
use mediadrop::extractor::{
    AcquisitionRequest, ExtractionEngine, ExtractionOutcome, ExtractionSuccess, Format,
    StrategyDescriptor, VideoInfo,
};
use mediadrop::utils::{AcquireError, FailureKind};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub enum Step {
    /// Write `actual` and report `predicted` as the output name
    Produce {
        predicted: &'static str,
        actual: &'static str,
        format_id: &'static str,
    },
    /// Report success without writing anything
    Claim { predicted: &'static str },
    Fail(FailureKind, &'static str),
    /// Never finish; signals `started` first
    Hang,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub format_selector: String,
    pub workspace: PathBuf,
    /// Files that were already in the workspace when the attempt began
    pub leftovers: Vec<String>,
}

pub struct FakeEngine {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
    pub started: Notify,
}

impl FakeEngine {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            started: Notify::new(),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionEngine for FakeEngine {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn invoke(
        &self,
        request: &AcquisitionRequest,
        strategy: &StrategyDescriptor,
        workspace: &Workspace,
    ) -> ExtractionOutcome {
        assert_eq!(strategy.mode, request.mode());

        let mut leftovers: Vec<String> = std::fs::read_dir(workspace.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        leftovers.sort();

        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                format_selector: strategy.format_selector.clone(),
                workspace: workspace.path().to_path_buf(),
                leftovers,
            });
            calls.len()
        };
        std::fs::write(
            workspace.path().join(format!("attempt-{}.part", attempt)),
            b"partial",
        )
        .unwrap();

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Fail(FailureKind::Unknown, "script exhausted"));

        match step {
            Step::Produce {
                predicted,
                actual,
                format_id,
            } => {
                std::fs::write(workspace.path().join(actual), b"media bytes").unwrap();
                success(workspace, predicted, format_id)
            }
            Step::Claim { predicted } => success(workspace, predicted, "18"),
            Step::Fail(kind, message) => ExtractionOutcome::failure(kind, message),
            Step::Hang => {
                self.started.notify_one();
                std::future::pending::<ExtractionOutcome>().await
            }
        }
    }

    async fn probe(&self, url: &str) -> Result<VideoInfo, AcquireError> {
        if url.contains("private") {
            return Err(AcquireError::AuthRequired("Sign in to confirm your age".to_string()));
        }
        Ok(VideoInfo {
            id: "abc".to_string(),
            title: "Clip".to_string(),
            formats: vec![Format {
                format_id: "18".to_string(),
                ext: Some("mp4".to_string()),
                height: Some(360),
                ..Default::default()
            }],
        })
    }
}

fn success(workspace: &Workspace, predicted: &str, format_id: &str) -> ExtractionOutcome {
    ExtractionOutcome::Success(ExtractionSuccess {
        predicted_path: workspace.path().join(predicted),
        title: "Clip".to_string(),
        chosen_format_id: format_id.to_string(),
    })
}

/// Entries left under the workspace root
pub fn remaining(root: &std::path::Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}
