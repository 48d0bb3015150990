//! Display-only text rendering of interpretation results.
//!
//! Output of this module is meant for people. Nothing reads it back;
//! callers that need the label or confidence use [`DiagnosisResult`].

use std::fmt::Write;

use chrono::NaiveDateTime;

use super::{DiagnosisResult, InterpretOutcome};

pub const DISCLAIMER: &str = "IMPORTANT MEDICAL DISCLAIMER:\n\
This AI analysis is for informational purposes only.\n\
Please consult a qualified dermatologist or healthcare professional\n\
for a proper medical diagnosis and treatment recommendations.";

/// Render a full analysis report.
pub fn render(result: &DiagnosisResult, analyzed_at: NaiveDateTime) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "SKIN CONDITION ANALYSIS RESULTS");
    let _ = writeln!(out, "===============================");
    let _ = writeln!(out);

    match result.outcome {
        InterpretOutcome::NoPredictions => {
            let _ = writeln!(out, "No predictions were returned by the classifier.");
            let _ = writeln!(out, "Check that the prediction endpoint is deployed.");
        }
        InterpretOutcome::Unextractable => {
            let _ = writeln!(out, "Unable to extract a prediction from the response.");
            if let Some(raw) = &result.raw {
                let _ = writeln!(out);
                let _ = writeln!(out, "Raw response:");
                let _ = writeln!(
                    out,
                    "{}",
                    serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
                );
            }
        }
        InterpretOutcome::Extracted => {
            let _ = writeln!(out, "Detected condition: {}", result.label);
            let _ = writeln!(out, "Confidence level: {}%", result.confidence_percent);
            let _ = writeln!(out, "{}", reliability_line(result));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{DISCLAIMER}");
    let _ = writeln!(out);
    let _ = write!(out, "Analysis time: {}", analyzed_at.format("%Y-%m-%d %H:%M:%S"));
    out
}

fn reliability_line(result: &DiagnosisResult) -> String {
    if result.reliability_tier.suggests_retake() {
        format!("Reliability: {} - consider retaking the image", result.reliability_tier)
    } else {
        format!("Reliability: {}", result.reliability_tier)
    }
}

/// Stored confidence fraction as a two-decimal percentage, e.g. `87.30%`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}
