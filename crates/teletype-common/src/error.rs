use thiserror::Error;

#[derive(Error, Debug)]
pub enum TeletypeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event system error: {0}")]
    Event(String),

    #[error("Unknown script: {0}")]
    UnknownScript(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Terminal is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TeletypeError>;
