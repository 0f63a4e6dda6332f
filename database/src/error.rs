use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Replay not found: {0}")]
    ReplayNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),
}

impl DatabaseError {
    pub(crate) fn query(e: sqlx::Error) -> Self {
        DatabaseError::Query(e.to_string())
    }
}
