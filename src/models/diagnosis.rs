use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A saved analysis result for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: i64,
    pub patient_id: i64,
    pub prediction: String,
    /// Fraction in `[0.0, 1.0]`.
    pub confidence: f64,
    pub image_path: Option<String>,
    pub analyzed_at: NaiveDateTime,
}

/// Field values for a diagnosis that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDiagnosis {
    pub patient_id: i64,
    pub prediction: String,
    pub confidence: f64,
    pub image_path: Option<String>,
}
