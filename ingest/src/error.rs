use database::DatabaseError;
use thiserror::Error;
use types::SetupError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Start position type {0} is not supported")]
    UnsupportedStartPosType(i64),

    #[error("Malformed demo data: {0}")]
    MalformedInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Map source error: {0}")]
    MapSource(#[from] MapSourceError),
}

impl From<SetupError> for IngestError {
    fn from(value: SetupError) -> Self {
        match value {
            SetupError::UnsupportedStartPosType(kind) => IngestError::UnsupportedStartPosType(kind),
            other => IngestError::MalformedInput(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum MapSourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Map metadata error: {0}")]
    Metadata(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Unknown map: {0}")]
    UnknownMap(String),
}
