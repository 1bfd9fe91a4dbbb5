use thiserror::Error;

pub type TraderResult<T> = Result<T, TraderError>;

#[derive(Debug, Error)]
pub enum TraderError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Io(#[from] IoError),

    /// The run was stopped between two episodes by an external interrupt.
    #[error("Run interrupted before episode {0}")]
    Interrupted(usize),
}

/// Errors occurring within agent logic, learning updates or checkpointing.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid action code: {0} (expected 0 = HOLD, 1 = BUY, 2 = SELL)")]
    InvalidAction(u8),

    #[error("Invalid input to agent: {0}")]
    InvalidInput(String),

    #[error("Learning update failed: {0}")]
    Training(String),

    #[error("Checkpoint failure: {0}")]
    Checkpoint(String),

    #[error("Unknown learning strategy: '{0}'")]
    UnknownStrategy(String),
}

/// Errors related to price data loading, parsing and splitting.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Missing column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Null price at row {row} in {source_name}")]
    NullPrice { row: usize, source_name: String },

    #[error("Price series is empty: {0}")]
    EmptySeries(String),

    #[error("Price series too short for {purpose}: need at least {required}, got {actual}")]
    SeriesTooShort {
        purpose: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Data frame error: {0}")]
    DataFrame(String),
}

/// Errors related to simulator configuration and execution.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot close a position: the ledger is empty")]
    LedgerEmpty,

    #[error("State window out of range (index: {index}, series length: {len})")]
    WindowOutOfRange { index: usize, len: usize },

    #[error("Progress bar error")]
    ProgressBar(#[from] indicatif::style::TemplateError),
}

/// Errors related to file I/O and serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("Postcard serialization failed")]
    Postcard(#[from] postcard::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read data: {0}")]
    ReadFailed(String),
}

