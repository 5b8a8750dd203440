//! Orchestrator configuration
//!
//! Loaded once at startup and shared read-only between requests.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Process-wide settings for the acquisition core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// yt-dlp binary; discovered when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Netscape cookie file handed to the engine when it exists
    pub cookies_file: Option<PathBuf>,

    /// ffmpeg binary or directory handed to the engine when it exists
    pub ffmpeg_location: Option<PathBuf>,

    /// Client identity sent with every engine request
    pub user_agent: String,

    /// Pass `--no-check-certificates` to the engine.
    ///
    /// On by default for compatibility with hosts serving broken chains.
    /// Logged at startup whenever enabled.
    pub skip_certificate_check: bool,

    /// Per-socket timeout forwarded to the engine
    pub socket_timeout_secs: u64,

    /// Upper bound on a single engine invocation
    pub extraction_timeout_secs: u64,

    /// Parent directory for per-request workspaces
    pub workspace_root: PathBuf,

    /// Container that split video/audio streams are merged into
    pub merge_container: Container,

    /// Codec audio requests are extracted to
    pub audio_codec: AudioCodec,

    /// Resolution and bitrate per quality hint
    pub ladder: QualityLadder,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            cookies_file: None,
            ffmpeg_location: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            skip_certificate_check: true,
            socket_timeout_secs: 30,
            extraction_timeout_secs: 1800,
            workspace_root: std::env::temp_dir().join("mediadrop"),
            merge_container: Container::Mp4,
            audio_codec: AudioCodec::Mp3,
            ladder: QualityLadder::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Load a JSON config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Drop optional paths that do not exist so the engine never sees them.
    pub fn without_missing_paths(mut self) -> Self {
        self.cookies_file = self.cookies_file.filter(|p| p.is_file());
        self.ffmpeg_location = self.ffmpeg_location.filter(|p| p.exists());
        self
    }
}

/// Merge target for video requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mkv,
    Webm,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
            Container::Webm => "webm",
        }
    }
}

/// Extraction target for audio requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Mp3,
    M4a,
    Opus,
}

impl AudioCodec {
    /// Value for `--audio-format`
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::M4a => "m4a",
            AudioCodec::Opus => "opus",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

/// Height ceilings and audio bitrates per quality hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityLadder {
    pub video_low: u32,
    pub video_standard: u32,
    pub video_high: u32,
    pub audio_low_kbps: u32,
    pub audio_standard_kbps: u32,
    pub audio_high_kbps: u32,
}

impl Default for QualityLadder {
    fn default() -> Self {
        Self {
            video_low: 240,
            video_standard: 360,
            video_high: 1080,
            audio_low_kbps: 96,
            audio_standard_kbps: 192,
            audio_high_kbps: 320,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert!(config.skip_certificate_check);
        assert!(config.extraction_timeout_secs > 0);
        assert_eq!(config.merge_container, Container::Mp4);
        assert_eq!(config.audio_codec, AudioCodec::Mp3);
        assert!(config.ladder.video_low < config.ladder.video_high);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "audio_codec": "opus", "ladder": { "video_standard": 720 } }"#,
        )
        .unwrap();

        let config = OrchestratorConfig::from_file(&path).unwrap();
        assert_eq!(config.audio_codec, AudioCodec::Opus);
        assert_eq!(config.ladder.video_standard, 720);
        assert_eq!(config.ladder.video_low, 240);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_missing_optional_paths_are_dropped() {
        let dir = TempDir::new().unwrap();
        let cookies = dir.path().join("cookies.txt");
        std::fs::write(&cookies, "# Netscape HTTP Cookie File\n").unwrap();

        let config = OrchestratorConfig {
            cookies_file: Some(cookies.clone()),
            ffmpeg_location: Some(dir.path().join("bin/ffmpeg")),
            ..Default::default()
        }
        .without_missing_paths();

        assert_eq!(config.cookies_file, Some(cookies));
        assert_eq!(config.ffmpeg_location, None);
    }
}
