//! Data structures for acquisition requests, strategies and engine results

use crate::utils::config::{AudioCodec, Container};
use crate::utils::error::{AcquireError, FailureKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What the caller wants out of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Video,
    Audio,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Video => "video",
            Mode::Audio => "audio",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AcquireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Mode::Video),
            "audio" => Ok(Mode::Audio),
            other => Err(AcquireError::InvalidRequest(format!(
                "unsupported mode '{}', expected 'video' or 'audio'",
                other
            ))),
        }
    }
}

/// Coarse quality preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityHint {
    Low,
    Standard,
    High,
}

impl QualityHint {
    /// Lenient parse: anything unrecognised means "use the mode default".
    pub fn parse_lenient(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "low" | "worst" => Some(QualityHint::Low),
            "standard" | "medium" | "normal" => Some(QualityHint::Standard),
            "high" | "best" => Some(QualityHint::High),
            _ => None,
        }
    }

    /// Default when the request carries no usable hint
    pub fn default_for(mode: Mode) -> Self {
        match mode {
            Mode::Video => QualityHint::Standard,
            // narrowest bandwidth footprint first
            Mode::Audio => QualityHint::Low,
        }
    }
}

/// Check that `source_url` is an absolute http(s) URL; returns it trimmed.
pub fn validate_url(source_url: &str) -> Result<String, AcquireError> {
    let trimmed = source_url.trim();
    if trimmed.is_empty() {
        return Err(AcquireError::InvalidRequest("URL parameter missing".to_string()));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| AcquireError::InvalidRequest(format!("malformed URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(AcquireError::InvalidRequest(format!(
            "URL must be an absolute http(s) address: {}",
            trimmed
        )));
    }

    Ok(trimmed.to_string())
}

/// Validated inbound request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    source_url: String,
    mode: Mode,
    quality_hint: Option<QualityHint>,
}

impl AcquisitionRequest {
    pub fn new(
        source_url: &str,
        mode: Mode,
        quality_hint: Option<QualityHint>,
    ) -> Result<Self, AcquireError> {
        Ok(Self {
            source_url: validate_url(source_url)?,
            mode,
            quality_hint,
        })
    }

    /// Build from raw tokens as they arrive from the serving layer.
    pub fn parse(
        source_url: Option<&str>,
        mode: Option<&str>,
        quality: Option<&str>,
    ) -> Result<Self, AcquireError> {
        let url = source_url
            .ok_or_else(|| AcquireError::InvalidRequest("URL parameter missing".to_string()))?;
        let mode = mode
            .ok_or_else(|| AcquireError::InvalidRequest("mode parameter missing".to_string()))?
            .parse::<Mode>()?;
        let quality_hint = quality.and_then(QualityHint::parse_lenient);
        Self::new(url, mode, quality_hint)
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn quality_hint(&self) -> Option<QualityHint> {
        self.quality_hint
    }

    /// Hint with the mode default applied
    pub fn effective_quality(&self) -> QualityHint {
        self.quality_hint
            .unwrap_or_else(|| QualityHint::default_for(self.mode))
    }
}

/// Post-processing the engine must apply after download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcess {
    /// Merge separate streams into one container
    Merge { container: Container },
    /// Extract and re-encode the audio track
    ExtractAudio { codec: AudioCodec, bitrate_kbps: u32 },
}

impl PostProcess {
    /// Extension the produced file ends up with
    pub fn final_extension(&self) -> &'static str {
        match self {
            PostProcess::Merge { container } => container.extension(),
            PostProcess::ExtractAudio { codec, .. } => codec.extension(),
        }
    }
}

/// How constrained a strategy is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyTier {
    Preferred,
    Permissive,
}

/// One candidate extraction plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyDescriptor {
    pub rank: usize,
    pub mode: Mode,
    pub tier: StrategyTier,
    pub format_selector: String,
    pub post_process: Option<PostProcess>,
}

impl StrategyDescriptor {
    pub fn label(&self) -> String {
        format!("{}#{} ({:?})", self.mode, self.rank, self.tier)
    }
}

/// Metadata reported by a successful engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSuccess {
    pub predicted_path: PathBuf,
    pub title: String,
    pub chosen_format_id: String,
}

/// Result of a single engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Success(ExtractionSuccess),
    Failure {
        classification: FailureKind,
        message: String,
    },
}

impl ExtractionOutcome {
    pub fn failure(classification: FailureKind, message: impl Into<String>) -> Self {
        ExtractionOutcome::Failure {
            classification,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }

    pub fn classification(&self) -> Option<FailureKind> {
        match self {
            ExtractionOutcome::Success(_) => None,
            ExtractionOutcome::Failure { classification, .. } => Some(*classification),
        }
    }
}

/// Media metadata listing, as returned by the formats endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub formats: Vec<Format>,
}

/// Single format entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub format_id: String,
    pub ext: Option<String>,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub fps: Option<f32>,
    pub tbr: Option<f32>, // Total bitrate
    pub filesize: Option<u64>,
    pub url: Option<String>,
}
