use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("entity already exists in this knowledge graph")]
    DuplicateEntity,

    #[error("entity not found")]
    EntityNotFound,

    #[error("relationship already exists")]
    DuplicateRelationship,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("internal storage error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
