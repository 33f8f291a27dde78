use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A tenant record with the same id already exists.
    #[error("Record already exists")]
    AlreadyExists,

    /// Another tenant already registered with this email.
    #[error("Email already registered")]
    EmailTaken,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Corrupt instance-set column.
    #[error("Instance set decode error: {0}")]
    InstanceSet(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
