//! Discovery of the engine binary and its optional companions
//!
//! The yt-dlp binary is searched in this order:
//! 1. Explicitly configured path
//! 2. Next to the running executable
//! 3. System PATH
//! 4. Common installation paths
//!
//! The cookie file and ffmpeg are optional. They are looked up relative to a
//! base directory (`<base>/cookies/youtube.txt`, `<base>/bin/ffmpeg`) and
//! left unset when absent.

use crate::utils::config::OrchestratorConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Find yt-dlp, honouring an explicit override first.
pub fn find_ytdlp(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if is_executable(path) {
            return Some(path.to_path_buf());
        }
        warn!("Configured yt-dlp is not executable: {}", path.display());
    }

    if let Some(local) = find_next_to_executable("yt-dlp") {
        info!("Using bundled yt-dlp: {}", local.display());
        return Some(local);
    }

    if let Ok(system) = which::which("yt-dlp") {
        info!("Using system yt-dlp: {}", system.display());
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        info!("Using yt-dlp from common path: {}", common.display());
        return Some(common);
    }

    warn!("yt-dlp not found anywhere");
    None
}

/// Directory that relative companion files are resolved against.
pub fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<base>/cookies/youtube.txt` when present
pub fn find_cookies_file(base: &Path) -> Option<PathBuf> {
    let candidate = base.join("cookies").join("youtube.txt");
    debug!("Checking cookie file: {}", candidate.display());
    candidate.is_file().then_some(candidate)
}

/// `<base>/bin/ffmpeg`, then ffmpeg from PATH
pub fn find_ffmpeg(base: &Path) -> Option<PathBuf> {
    let bundled = base.join("bin").join(ffmpeg_name());
    if bundled.is_file() {
        return Some(bundled);
    }
    which::which("ffmpeg").ok()
}

/// Fill in whatever the config leaves unset from the filesystem.
///
/// `ytdlp_path` comes back as the one binary to use: the configured path
/// when it is executable, otherwise the first hit of [`find_ytdlp`].
pub fn discover(mut config: OrchestratorConfig, base: &Path) -> OrchestratorConfig {
    config.ytdlp_path = find_ytdlp(config.ytdlp_path.as_deref());
    if config.cookies_file.is_none() {
        config.cookies_file = find_cookies_file(base);
    }
    if config.ffmpeg_location.is_none() {
        config.ffmpeg_location = find_ffmpeg(base);
    }
    config.without_missing_paths()
}

fn ffmpeg_name() -> &'static str {
    if cfg!(windows) {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

fn find_next_to_executable(name: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join(name);
    is_executable(&candidate).then_some(candidate)
}

fn find_in_common_paths() -> Option<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("/opt/homebrew/bin/yt-dlp"),
        PathBuf::from("/usr/local/bin/yt-dlp"),
        PathBuf::from("/usr/bin/yt-dlp"),
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local").join("bin").join("yt-dlp"));
    }

    candidates.into_iter().find(|p| is_executable(p))
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
