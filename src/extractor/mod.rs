//! Strategy resolution and the extraction engine boundary

pub mod diagnostics;
pub mod models;
pub mod policy;
pub mod traits;
pub mod ytdlp;

pub use models::{
    AcquisitionRequest, ExtractionOutcome, ExtractionSuccess, Format, Mode, PostProcess,
    QualityHint, StrategyDescriptor, StrategyTier, VideoInfo,
};
pub use policy::FormatPolicy;
pub use traits::ExtractionEngine;
pub use ytdlp::YtDlpEngine;
