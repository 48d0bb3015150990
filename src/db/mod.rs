pub mod repository;
pub mod sqlite;
pub mod store;

pub use repository::*;
pub use sqlite::*;
pub use store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Patient {patient_id} does not exist")]
    ReferentialIntegrity { patient_id: i64 },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Internal lock error")]
    LockPoisoned,
}

impl DatabaseError {
    /// True when the storage medium failed, as opposed to the caller
    /// supplying bad data.
    pub fn is_persistence(&self) -> bool {
        !matches!(
            self,
            Self::Validation(_) | Self::ReferentialIntegrity { .. }
        )
    }
}
