use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("user id was not present in the request identity")]
    IdentityMissing,

    #[error("no valid scope ids were supplied")]
    EmptyScopeSet,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("ingestion failed: {0}")]
    Ingestion(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
