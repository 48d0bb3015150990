//! Result interpretation — raw classifier candidates to a graded result.
//!
//! Pure: no I/O, no clock, no randomness. The classifier is trusted to
//! rank its candidates; only the first one is read.

pub mod report;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ReliabilityTier;

/// Label used whenever no usable prediction could be extracted.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Candidate field holding the ranked display names.
pub const DISPLAY_NAMES_FIELD: &str = "displayNames";

/// Candidate field holding the confidences parallel to the names.
pub const CONFIDENCES_FIELD: &str = "confidences";

/// How the interpretation went. Neither non-`Extracted` case is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretOutcome {
    Extracted,
    /// A candidate was returned but carried no usable label.
    Unextractable,
    NoPredictions,
}

/// Structured interpretation of one classifier response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub label: String,
    /// Top-candidate confidence, clamped to `[0, 1]`.
    pub confidence: f64,
    /// `round(confidence * 100)`, always 0–100.
    pub confidence_percent: u8,
    pub reliability_tier: ReliabilityTier,
    /// The untouched top candidate, kept only when extraction failed.
    pub raw: Option<Value>,
    pub outcome: InterpretOutcome,
}

impl DiagnosisResult {
    fn unknown(raw: Option<Value>, outcome: InterpretOutcome) -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
            confidence_percent: 0,
            reliability_tier: ReliabilityTier::Low,
            raw,
            outcome,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.label == UNKNOWN_LABEL
    }
}

/// Interpret a ranked candidate list from the classifier.
pub fn interpret(candidates: &[Value]) -> DiagnosisResult {
    let Some(top) = candidates.first() else {
        return DiagnosisResult::unknown(None, InterpretOutcome::NoPredictions);
    };

    let label = first_entry(top, DISPLAY_NAMES_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != UNKNOWN_LABEL);

    // Unextractable results always carry 0%
    let Some(label) = label else {
        return DiagnosisResult::unknown(Some(top.clone()), InterpretOutcome::Unextractable);
    };

    let confidence = first_entry(top, CONFIDENCES_FIELD)
        .and_then(Value::as_f64)
        .map(normalize_confidence)
        .unwrap_or(0.0);

    let confidence_percent = to_percent(confidence);

    DiagnosisResult {
        label: label.to_string(),
        confidence,
        confidence_percent,
        reliability_tier: ReliabilityTier::from_percent(confidence_percent),
        raw: None,
        outcome: InterpretOutcome::Extracted,
    }
}

/// First element of a list-valued field, if the field is a non-empty list.
fn first_entry<'a>(candidate: &'a Value, field: &str) -> Option<&'a Value> {
    candidate.get(field)?.as_array()?.first()
}

fn normalize_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Round-half-up percentage of a fraction already clamped to `[0, 1]`.
fn to_percent(confidence: f64) -> u8 {
    (confidence * 100.0 + 0.5).floor().clamp(0.0, 100.0) as u8
}
