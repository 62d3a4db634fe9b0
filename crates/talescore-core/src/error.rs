use thiserror::Error;

use talescore_provider::ProviderError;

/// Errors that abort a whole scoring run. Per-item scoring failures are not
/// represented here; they are logged and skipped.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("failed to serialize score payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to construct provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("tale not found: {0}")]
    TaleNotFound(String),

    #[error("no published tales to score")]
    NoTales,

    #[error("no credentials available for any configured provider")]
    NoCredentials,
}
