//! Classification collaborator — the remote image classifier boundary.
//!
//! The classifier itself is opaque. This module only knows how to send
//! it image bytes and receive its ranked candidate list, plus how to
//! run that round-trip as a cancellable background task.

pub mod client;
pub mod task;

pub use client::*;
pub use task::*;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Classifier is not reachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Classifier returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Classification timed out after {0}s")]
    Timeout(u64),

    #[error("Classification cancelled")]
    Cancelled,

    #[error("Classification task failed: {0}")]
    TaskFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can turn image bytes into ranked candidates.
///
/// Each candidate is the classifier's own JSON object; see
/// [`crate::interpreter::interpret`] for the fields that are read.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<Vec<Value>, ClassifierError>;
}

/// Load image bytes for classification. No decoding is attempted.
pub async fn read_image(path: &Path) -> Result<Vec<u8>, ClassifierError> {
    let bytes = tokio::fs::read(path).await?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Image loaded");
    Ok(bytes)
}
