// ================================================================
// File: modbot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Task queue error: {0}")]
    TaskQueue(String),

    // Definition errors: scoped to a single filter or cleanup definition.
    #[error("Invalid word group `{group}` in `{word_groups}`: only letters and digits separated by `|` are allowed")]
    InvalidWordGroup { word_groups: String, group: String },

    #[error("Word group definition `{0}` contains no words")]
    EmptyWordGroup(String),

    #[error("Invalid cron expression `{expression}`: {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("Cron expression `{0}` has no future occurrence")]
    NoFutureOccurrence(String),

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
}

impl Error {
    /// True for errors that belong to one filter or cleanup definition and
    /// should be reported to whoever edited it.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidWordGroup { .. }
                | Error::EmptyWordGroup(_)
                | Error::InvalidCron { .. }
                | Error::NoFutureOccurrence(_)
                | Error::InvalidDefinition(_)
        )
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Platform(e.to_string())
    }
}

impl From<chrono::OutOfRangeError> for Error {
    fn from(err: chrono::OutOfRangeError) -> Self {
        Error::Parse(err.to_string())
    }
}
