//! Fallback executor
//!
//! Runs strategies strictly one after another. Only `FormatUnavailable`
//! moves the chain forward; every other failure ends it.

use crate::downloader::workspace::Workspace;
use crate::extractor::models::{AcquisitionRequest, ExtractionOutcome, StrategyDescriptor};
use crate::extractor::traits::ExtractionEngine;
use crate::utils::error::FailureKind;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Final result of a fallback chain
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: ExtractionOutcome,
    /// Strategy that produced `outcome`
    pub strategy: Option<StrategyDescriptor>,
    pub attempts: usize,
}

pub struct FallbackExecutor {
    engine: Arc<dyn ExtractionEngine>,
}

impl FallbackExecutor {
    pub fn new(engine: Arc<dyn ExtractionEngine>) -> Self {
        Self { engine }
    }

    pub async fn execute(
        &self,
        request: &AcquisitionRequest,
        strategies: &[StrategyDescriptor],
        workspace: &Workspace,
    ) -> Execution {
        let mut last = Execution {
            outcome: ExtractionOutcome::failure(FailureKind::Unknown, "no extraction strategies"),
            strategy: None,
            attempts: 0,
        };

        for (i, strategy) in strategies.iter().enumerate() {
            if i > 0 {
                // leftovers from the failed attempt must not be mistaken for output
                if let Err(e) = workspace.discard_contents().await {
                    warn!("Could not reset workspace before retry: {}", e);
                    return Execution {
                        outcome: ExtractionOutcome::failure(
                            FailureKind::Workspace,
                            format!("could not reset workspace: {}", e),
                        ),
                        strategy: Some(strategy.clone()),
                        attempts: last.attempts,
                    };
                }
            }

            debug!(
                "Trying strategy {} with selector '{}'",
                strategy.label(),
                strategy.format_selector
            );
            let outcome = self.engine.invoke(request, strategy, workspace).await;
            last = Execution {
                outcome,
                strategy: Some(strategy.clone()),
                attempts: i + 1,
            };

            match &last.outcome {
                ExtractionOutcome::Success(success) => {
                    info!(
                        "Strategy {} succeeded with format {}",
                        strategy.label(),
                        success.chosen_format_id
                    );
                    return last;
                }
                ExtractionOutcome::Failure {
                    classification,
                    message,
                } if classification.is_recoverable() && i + 1 < strategies.len() => {
                    warn!(
                        "Strategy {} unavailable ({}), falling back",
                        strategy.label(),
                        message
                    );
                }
                ExtractionOutcome::Failure {
                    classification,
                    message,
                } => {
                    warn!(
                        "Strategy {} failed with {}: {}",
                        strategy.label(),
                        classification,
                        message
                    );
                    return last;
                }
            }
        }

        last
    }
}
