use thiserror::Error;

#[derive(Error, Debug)]
pub enum KgError {
    #[error(transparent)]
    Storage(#[from] agenticlaw_storage::StorageError),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("no path between {from} and {to}")]
    NoPath { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, KgError>;
