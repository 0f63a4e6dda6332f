use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SetupError {
    #[error("Unsupported start position type: {0}")]
    UnsupportedStartPosType(i64),

    #[error("Invalid team color: {0:?}")]
    InvalidColor(String),
}
