//! yt-dlp adapter
//!
//! Runs the yt-dlp binary once per strategy. The download is performed with
//! `--dump-json --no-simulate` so the predicted filename and metadata come back
//! on stdout while the media lands in the request's workspace.

use crate::downloader::workspace::Workspace;
use crate::extractor::diagnostics::{classify, normalize_message};
use crate::extractor::models::{
    AcquisitionRequest, ExtractionOutcome, ExtractionSuccess, PostProcess, StrategyDescriptor,
    VideoInfo,
};
use crate::extractor::traits::ExtractionEngine;
use crate::utils::config::OrchestratorConfig;
use crate::utils::error::{AcquireError, FailureKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::{debug, error};

/// Output template relative to the workspace. Titles are capped in bytes so
/// long names stay under filesystem limits.
const OUTPUT_TEMPLATE: &str = "%(title).150B.%(ext)s";

/// Raw result of one yt-dlp process
#[derive(Debug)]
struct EngineRun {
    /// `None` when the process was killed by a signal
    code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Extraction engine backed by the yt-dlp CLI
pub struct YtDlpEngine {
    ytdlp_path: PathBuf,
    config: Arc<OrchestratorConfig>,
}

impl YtDlpEngine {
    /// Use a specific binary without any discovery.
    pub fn with_binary(ytdlp_path: impl Into<PathBuf>, config: Arc<OrchestratorConfig>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            config,
        }
    }

    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// Options shared by downloads and probes
    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--no-color".to_string(),
            "--no-playlist".to_string(),
            "--user-agent".to_string(),
            self.config.user_agent.clone(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_secs.to_string(),
        ];

        if let Some(cookies) = self.config.cookies_file.as_ref().filter(|p| p.is_file()) {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }

        if let Some(ffmpeg) = self.config.ffmpeg_location.as_ref().filter(|p| p.exists()) {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().to_string());
        }

        if self.config.skip_certificate_check {
            // compatibility concession, announced at startup
            args.push("--no-check-certificates".to_string());
        }

        args
    }

    /// Full argument vector for one download attempt
    pub fn download_args(
        &self,
        request: &AcquisitionRequest,
        strategy: &StrategyDescriptor,
        workspace_dir: &Path,
    ) -> Vec<String> {
        let mut args = self.common_args();
        args.extend([
            "--no-progress".to_string(),
            "--no-mtime".to_string(),
            "--dump-json".to_string(),
            "--no-simulate".to_string(),
            "-f".to_string(),
            strategy.format_selector.clone(),
        ]);

        match strategy.post_process {
            Some(PostProcess::Merge { container }) => {
                args.push("--merge-output-format".to_string());
                args.push(container.extension().to_string());
            }
            Some(PostProcess::ExtractAudio {
                codec,
                bitrate_kbps,
            }) => {
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.as_str().to_string());
                args.push("--audio-quality".to_string());
                args.push(format!("{}K", bitrate_kbps));
            }
            None => {}
        }

        // Directory goes through -P so a '%' in it is never read as a field.
        args.push("-P".to_string());
        args.push(workspace_dir.to_string_lossy().to_string());
        args.push("-o".to_string());
        args.push(OUTPUT_TEMPLATE.to_string());
        args.push("--".to_string());
        args.push(request.source_url().to_string());
        args
    }

    /// Argument vector for a metadata-only probe
    pub fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args = self.common_args();
        args.extend([
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--".to_string(),
            url.to_string(),
        ]);
        args
    }

    async fn run(&self, args: &[String]) -> Result<EngineRun, (FailureKind, String)> {
        debug!("Running {} {:?}", self.ytdlp_path.display(), args);
        if self.config.skip_certificate_check {
            debug!("Certificate validation disabled for this invocation");
        }

        let mut command = AsyncCommand::new(&self.ytdlp_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // own group, so ffmpeg started for merging dies with yt-dlp
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| {
            (
                FailureKind::EngineCrash,
                format!("failed to start {}: {}", self.ytdlp_path.display(), e),
            )
        })?;
        let group = ProcessGroupGuard::new(child.id());

        let limit = self.config.extraction_timeout();
        match timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                group.disarm();
                Ok(EngineRun {
                    code: output.status.code(),
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Ok(Err(e)) => Err((
                FailureKind::EngineCrash,
                format!("failed to wait for yt-dlp: {}", e),
            )),
            // the guard kills the group; dropping the wait future kills the child
            Err(_) => Err((
                FailureKind::NetworkError,
                format!("yt-dlp timed out after {} seconds", limit.as_secs()),
            )),
        }
    }
}

/// Kills the engine's whole process group when dropped while armed.
///
/// Covers timeouts and cancelled futures. Disarmed once yt-dlp has exited
/// on its own, at which point its post-processors have finished too.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal to the group created for our child.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        debug!("Killed yt-dlp process group {}", pgid);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    async fn invoke(
        &self,
        request: &AcquisitionRequest,
        strategy: &StrategyDescriptor,
        workspace: &Workspace,
    ) -> ExtractionOutcome {
        let args = self.download_args(request, strategy, workspace.path());
        match self.run(&args).await {
            Ok(run) => interpret_download(run.code, &run.stdout, &run.stderr),
            Err((classification, message)) => ExtractionOutcome::Failure {
                classification,
                message,
            },
        }
    }

    async fn probe(&self, url: &str) -> Result<VideoInfo, AcquireError> {
        let args = self.probe_args(url);
        let run = self
            .run(&args)
            .await
            .map_err(|(kind, message)| AcquireError::from_kind(kind, message))?;

        if run.code != Some(0) {
            let stderr = String::from_utf8_lossy(&run.stderr);
            error!("yt-dlp probe failed: {}", stderr.trim());
            return Err(AcquireError::from_kind(
                failure_kind(run.code, &stderr),
                normalize_message(&stderr),
            ));
        }

        let stdout = String::from_utf8_lossy(&run.stdout);
        let line = last_json_line(&stdout).ok_or_else(|| {
            AcquireError::EngineCrash("yt-dlp printed no metadata".to_string())
        })?;
        serde_json::from_str::<VideoInfo>(line)
            .map_err(|e| AcquireError::EngineCrash(format!("unreadable yt-dlp metadata: {}", e)))
    }
}

fn failure_kind(code: Option<i32>, stderr: &str) -> FailureKind {
    if code.is_none() {
        FailureKind::EngineCrash
    } else {
        classify(stderr)
    }
}

fn last_json_line(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
}

/// Turn a finished download process into an outcome.
fn interpret_download(code: Option<i32>, stdout: &[u8], stderr: &[u8]) -> ExtractionOutcome {
    let stderr = String::from_utf8_lossy(stderr);

    if code != Some(0) {
        let classification = failure_kind(code, &stderr);
        let message = match code {
            None => "yt-dlp was terminated by a signal".to_string(),
            Some(_) => normalize_message(&stderr),
        };
        debug!("yt-dlp failed ({}): {}", classification, stderr.trim());
        return ExtractionOutcome::Failure {
            classification,
            message,
        };
    }

    let stdout = String::from_utf8_lossy(stdout);
    let parsed = last_json_line(&stdout)
        .and_then(|line| serde_json::from_str::<serde_json::Value>(line).ok());
    let Some(info) = parsed else {
        return ExtractionOutcome::failure(
            FailureKind::EngineCrash,
            "yt-dlp exited successfully but printed no metadata",
        );
    };

    let predicted = info["filename"]
        .as_str()
        .or_else(|| info["_filename"].as_str());
    let Some(predicted) = predicted else {
        return ExtractionOutcome::failure(
            FailureKind::EngineCrash,
            "yt-dlp did not report an output filename",
        );
    };

    ExtractionOutcome::Success(ExtractionSuccess {
        predicted_path: PathBuf::from(predicted),
        title: info["title"].as_str().unwrap_or_default().to_string(),
        chosen_format_id: info["format_id"].as_str().unwrap_or_default().to_string(),
    })
}
