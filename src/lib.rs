pub mod app;
pub mod classifier;
pub mod config;
pub mod db;
pub mod history;
pub mod intake;
pub mod interpreter;
pub mod models;

pub use classifier::{AnalysisTask, Classifier, ClassifierError, PredictionClient};
pub use db::{DatabaseError, RecordStore};
pub use history::HistoryQuery;
pub use interpreter::{interpret, DiagnosisResult, InterpretOutcome};
