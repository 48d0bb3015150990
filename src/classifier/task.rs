//! Background analysis: classify off the calling thread, interpret the
//! response, and hand back a typed outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Classifier, ClassifierError};
use crate::interpreter::{interpret, DiagnosisResult, InterpretOutcome};

/// A classification running on the tokio runtime.
///
/// Dropping the task does not stop it; call [`AnalysisTask::cancel`]
/// for that.
pub struct AnalysisTask {
    handle: JoinHandle<Result<DiagnosisResult, ClassifierError>>,
    cancel_token: CancellationToken,
}

impl AnalysisTask {
    /// Start classifying `image`. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(classifier: Arc<dyn Classifier>, image: Vec<u8>, timeout: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let call = tokio::time::timeout(timeout, classifier.classify(&image));
            let candidates = tokio::select! {
                _ = token.cancelled() => {
                    tracing::warn!("Analysis cancelled");
                    return Err(ClassifierError::Cancelled);
                }
                outcome = call => match outcome {
                    Ok(Ok(candidates)) => candidates,
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        tracing::warn!(timeout_secs = timeout.as_secs(), "Analysis timed out");
                        return Err(ClassifierError::Timeout(timeout.as_secs()));
                    }
                },
            };

            let result = interpret(&candidates);
            match result.outcome {
                InterpretOutcome::Extracted => tracing::info!(
                    label = %result.label,
                    percent = result.confidence_percent,
                    tier = result.reliability_tier.as_str(),
                    "Analysis complete"
                ),
                InterpretOutcome::Unextractable => {
                    tracing::warn!("Classifier response had no usable label")
                }
                InterpretOutcome::NoPredictions => {
                    tracing::warn!("Classifier returned no predictions")
                }
            }
            Ok(result)
        });

        Self {
            handle,
            cancel_token,
        }
    }

    /// Request cancellation. The outcome becomes `Cancelled` unless the
    /// classification already finished.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// A token that cancels this task, for callers that outlive `self`.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the analysis to finish.
    pub async fn outcome(self) -> Result<DiagnosisResult, ClassifierError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ClassifierError::Cancelled),
            Err(e) => Err(ClassifierError::TaskFailed(e.to_string())),
        }
    }
}
