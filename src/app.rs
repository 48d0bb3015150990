//! Process entry: logging setup, store lifecycle, and the two
//! command-line actions (history listing, single-image analysis).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::classifier::{read_image, AnalysisTask, ClassifierError, PredictionClient};
use crate::config::{self, ClassifierConfig};
use crate::db::{DatabaseError, RecordStore};
use crate::history::HistoryQuery;
use crate::intake::{self, IntakeError, PatientForm};
use crate::interpreter::report;

#[derive(Parser, Debug)]
#[command(name = "dermascan")]
#[command(about = "Skin-condition analysis and patient records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored patients with their latest diagnosis (default)
    History,
    /// Classify one image; with --name, save the result as a new patient visit
    Analyze {
        image: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

impl Commands {
    /// Patient form for an `analyze` run, if a name was given.
    fn patient_form(&self) -> Option<PatientForm> {
        match self {
            Commands::Analyze {
                name: Some(name),
                age,
                phone,
                email,
                ..
            } => Some(PatientForm {
                name: name.clone(),
                age: age.clone().unwrap_or_default(),
                phone: phone.clone().unwrap_or_default(),
                email: email.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("No classifier configured; set {}", config::CLASSIFIER_URL_ENV)]
    ClassifierNotConfigured,
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Run the parsed command line against the on-disk record store.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let store = RecordStore::open(&config::database_path())?;
    let command = cli.command.unwrap_or(Commands::History);
    let form = command.patient_form();
    let outcome = match command {
        Commands::History => print_history(&store),
        Commands::Analyze { image, .. } => analyze(&store, image, form).await,
    };
    store.close()?;
    outcome
}

fn print_history(store: &RecordStore) -> Result<(), AppError> {
    let summaries = HistoryQuery::new(store).summaries()?;
    if summaries.is_empty() {
        println!("No patients recorded.");
        return Ok(());
    }
    for summary in summaries {
        let latest = summary
            .latest
            .map(|d| format!("{} ({})", d.prediction, report::format_confidence(d.confidence)))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<5} {:<30} diagnoses: {:<3} latest: {}",
            summary.patient.id, summary.patient.name, summary.diagnosis_count, latest
        );
    }
    Ok(())
}

async fn analyze(
    store: &RecordStore,
    image_path: PathBuf,
    form: Option<PatientForm>,
) -> Result<(), AppError> {
    // Validate before classifying
    if let Some(form) = &form {
        form.validate()?;
    }

    let classifier_config = ClassifierConfig::from_env().ok_or(AppError::ClassifierNotConfigured)?;
    let classifier = Arc::new(PredictionClient::new(&classifier_config)?);
    let image = read_image(&image_path).await?;

    let task = AnalysisTask::spawn(classifier, image, classifier_config.timeout);
    let cancel = task.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = task.outcome().await;
    interrupt.abort();
    let result = result?;

    println!("{}", report::render(&result, chrono::Local::now().naive_local()));

    if let Some(form) = form {
        let image = image_path.to_string_lossy();
        let saved = intake::save_analysis(store, &form, &result, Some(image.as_ref()))?;
        println!(
            "Saved patient #{} with diagnosis #{}",
            saved.patient_id, saved.diagnosis_id
        );
    }
    Ok(())
}
