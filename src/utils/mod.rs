//! Configuration, discovery and error types shared by the core

pub mod config;
pub mod error;
pub mod filename;
pub mod paths;

pub use config::{AudioCodec, Container, OrchestratorConfig, QualityLadder};
pub use error::{AcquireError, FailureKind};
pub use filename::{sanitize_filename, suggested_filename};
