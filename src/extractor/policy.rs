//! Format policy: turns (mode, quality) into an ordered fallback chain
//!
//! Every chain runs from most restrictive to most permissive and never
//! leaves the requested mode: video selectors always require a video track,
//! audio strategies always extract audio.

use crate::extractor::models::{Mode, PostProcess, QualityHint, StrategyDescriptor, StrategyTier};
use crate::utils::config::{AudioCodec, Container, OrchestratorConfig, QualityLadder};

/// Builds strategy lists from the configured quality ladder
#[derive(Debug, Clone)]
pub struct FormatPolicy {
    ladder: QualityLadder,
    merge_container: Container,
    audio_codec: AudioCodec,
}

impl FormatPolicy {
    pub fn new(ladder: QualityLadder, merge_container: Container, audio_codec: AudioCodec) -> Self {
        Self {
            ladder,
            merge_container,
            audio_codec,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.ladder, config.merge_container, config.audio_codec)
    }

    /// Ordered, non-empty strategy list for a request.
    pub fn resolve(&self, mode: Mode, quality_hint: Option<QualityHint>) -> Vec<StrategyDescriptor> {
        let quality = quality_hint.unwrap_or_else(|| QualityHint::default_for(mode));
        let plans = match mode {
            Mode::Video => self.video_plans(quality),
            Mode::Audio => self.audio_plans(quality),
        };

        plans
            .into_iter()
            .enumerate()
            .map(|(rank, (tier, format_selector, post_process))| StrategyDescriptor {
                rank,
                mode,
                tier,
                format_selector,
                post_process,
            })
            .collect()
    }

    pub fn max_height(&self, quality: QualityHint) -> u32 {
        match quality {
            QualityHint::Low => self.ladder.video_low,
            QualityHint::Standard => self.ladder.video_standard,
            QualityHint::High => self.ladder.video_high,
        }
    }

    pub fn audio_bitrate(&self, quality: QualityHint) -> u32 {
        match quality {
            QualityHint::Low => self.ladder.audio_low_kbps,
            QualityHint::Standard => self.ladder.audio_standard_kbps,
            QualityHint::High => self.ladder.audio_high_kbps,
        }
    }

    fn video_plans(&self, quality: QualityHint) -> Vec<(StrategyTier, String, Option<PostProcess>)> {
        let h = self.max_height(quality);
        // Combined streams first, then split streams merged by the engine.
        let bounded = format!(
            "best[height<={h}][vcodec!=none][acodec!=none]/bestvideo[height<={h}]+bestaudio/best[height<={h}][vcodec!=none]"
        );
        let permissive = "best[vcodec!=none]/bestvideo*+bestaudio/bestvideo*".to_string();

        vec![
            (
                StrategyTier::Preferred,
                bounded,
                Some(PostProcess::Merge {
                    container: self.merge_container,
                }),
            ),
            (StrategyTier::Permissive, permissive, None),
        ]
    }

    fn audio_plans(&self, quality: QualityHint) -> Vec<(StrategyTier, String, Option<PostProcess>)> {
        let extract = PostProcess::ExtractAudio {
            codec: self.audio_codec,
            bitrate_kbps: self.audio_bitrate(quality),
        };
        let audio_only = match quality {
            QualityHint::Low => "worstaudio/bestaudio",
            QualityHint::Standard | QualityHint::High => "bestaudio",
        };
        let permissive = "bestaudio*/best[acodec!=none]";

        vec![
            (StrategyTier::Preferred, audio_only.to_string(), Some(extract)),
            (StrategyTier::Permissive, permissive.to_string(), Some(extract)),
        ]
    }
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}
