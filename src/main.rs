//! Mediadrop - HTTP media acquisition service
//!
//! Serves `/formats` and `/download` on top of yt-dlp.

use anyhow::{Context, Result};
use clap::Parser;
use mediadrop::server::{self, AppState};
use mediadrop::utils::{paths, OrchestratorConfig};
use mediadrop::{Orchestrator, YtDlpEngine};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mediadrop", version, about = "HTTP media acquisition service")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "MEDIADROP_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// JSON configuration file
    #[arg(long, env = "MEDIADROP_CONFIG")]
    config: Option<PathBuf>,

    /// yt-dlp executable
    #[arg(long, env = "MEDIADROP_YTDLP")]
    ytdlp: Option<PathBuf>,

    /// Netscape cookie file passed to yt-dlp
    #[arg(long, env = "MEDIADROP_COOKIES")]
    cookies: Option<PathBuf>,

    /// ffmpeg binary or directory
    #[arg(long, env = "MEDIADROP_FFMPEG")]
    ffmpeg: Option<PathBuf>,

    /// Directory holding per-request workspaces
    #[arg(long, env = "MEDIADROP_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Verify TLS certificates of upstream hosts
    #[arg(long, env = "MEDIADROP_STRICT_CERTIFICATES")]
    strict_certificates: bool,

    /// Height cap for standard quality video
    #[arg(long, env = "MEDIADROP_MAX_HEIGHT")]
    max_height: Option<u32>,

    /// Bitrate in kbps for standard quality audio
    #[arg(long, env = "MEDIADROP_AUDIO_BITRATE")]
    audio_bitrate: Option<u32>,

    /// Log filter, e.g. `info` or `mediadrop=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

impl Args {
    /// Layer flags over the file (or default) configuration.
    fn into_config(self) -> Result<OrchestratorConfig> {
        let mut config = match &self.config {
            Some(path) => OrchestratorConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => OrchestratorConfig::default(),
        };

        if let Some(path) = self.ytdlp {
            config.ytdlp_path = Some(path);
        }
        if let Some(path) = self.cookies {
            config.cookies_file = Some(path);
        }
        if let Some(path) = self.ffmpeg {
            config.ffmpeg_location = Some(path);
        }
        if let Some(root) = self.workspace_root {
            config.workspace_root = root;
        }
        if self.strict_certificates {
            config.skip_certificate_check = false;
        }
        if let Some(height) = self.max_height {
            config.ladder.video_standard = height;
        }
        if let Some(kbps) = self.audio_bitrate {
            config.ladder.audio_standard_kbps = kbps;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = args.bind;
    let config = args.into_config()?;
    let config = paths::discover(config, &paths::base_dir());

    if config.skip_certificate_check {
        warn!("TLS certificate verification is disabled for upstream requests");
    }
    match &config.cookies_file {
        Some(path) => info!("Using cookies from {}", path.display()),
        None => info!("No cookie file found, age or login gated media will fail"),
    }
    if config.ffmpeg_location.is_none() {
        warn!("ffmpeg not found, merging and audio extraction will fail");
    }

    let ytdlp = config
        .ytdlp_path
        .clone()
        .context("yt-dlp not found; install it (pip install yt-dlp) or pass --ytdlp")?;
    let config = Arc::new(config);
    let engine = YtDlpEngine::with_binary(ytdlp, config.clone());

    let orchestrator = Orchestrator::new(Arc::new(engine), &config);
    orchestrator
        .workspaces()
        .prepare()
        .await
        .with_context(|| {
            format!(
                "creating workspace root {}",
                orchestrator.workspaces().root().display()
            )
        })?;

    let state = AppState::new(Arc::new(orchestrator));
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    server::serve(bind, state).await
}
