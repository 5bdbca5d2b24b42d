use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validator key {0} is not registered in subnet")]
    NotRegistered(String),
    #[error("malformed answer: {0}")]
    MalformedAnswer(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("ledger error: {0}")]
    Ledger(String),
    #[error("invalid config: {0}")]
    Config(String),
}
