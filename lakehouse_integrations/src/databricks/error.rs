use thiserror::Error;

/// Errors raised while talking to the Databricks REST API.
///
/// Statement failures reported by the warehouse are not errors: they come back
/// as [`crate::ExecutionOutcome::Failed`].
#[derive(Debug, Error)]
pub enum DatabricksError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("DATABRICKS_SQL_WAREHOUSE_ID is not set; configure a SQL warehouse to run statements")]
    MissingWarehouse,

    /// The statement endpoint refused the request before execution started.
    #[error("statement submission rejected (HTTP {status}): {message}")]
    Submission {
        status: u16,
        error_code: Option<String>,
        message: String,
    },

    #[error("API request failed with status {status}: {message}")]
    Api {
        status: u16,
        error_code: Option<String>,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("result chunk {requested} was expected but chunk {received} was returned")]
    ChunkOrder { requested: u32, received: u32 },

    #[error("result declares {expected} chunks but {received} were received")]
    MissingChunks { expected: u32, received: u32 },

    #[error("row {row} has {cells} cells but the result declares {columns} columns")]
    RowShape {
        row: usize,
        cells: usize,
        columns: usize,
    },
}

impl DatabricksError {
    /// Re-tags an API rejection as a submission failure.
    pub(crate) fn into_submission(self) -> Self {
        match self {
            Self::Api {
                status,
                error_code,
                message,
            } => Self::Submission {
                status,
                error_code,
                message,
            },
            other => other,
        }
    }
}

impl From<reqwest::Error> for DatabricksError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
