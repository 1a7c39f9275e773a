use super::{DatabricksError, DatabricksRestClient, ExecutionBudget};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;

const SQL_STATEMENTS_ENDPOINT: &str = "/api/2.0/sql/statements";

/// Identifier the warehouse assigns to a submitted statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementHandle(String);

impl StatementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlStatementRequest {
    pub statement: String,
    pub warehouse_id: String,
    pub disposition: String,
    pub format: String,
    pub wait_timeout: String,
    pub on_wait_timeout: String,
    /// How long the server may hold the submission call open.
    #[serde(skip)]
    pub server_wait: Duration,
}

/// Lifecycle state as reported by the statement execution API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementStatus {
    pub state: RemoteState,
    pub error: Option<StatementErrorInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementErrorInfo {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultManifest {
    pub schema: Option<ResultSchema>,
    pub total_chunk_count: Option<u32>,
    pub total_row_count: Option<u64>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSchema {
    #[serde(default)]
    pub columns: Vec<ManifestColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestColumn {
    pub name: String,
    pub type_text: Option<String>,
    pub type_name: Option<String>,
}

/// One page of result rows. The inline `result` of a statement response is
/// chunk 0; later chunks come from the chunk endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultChunk {
    pub chunk_index: Option<u32>,
    pub row_offset: Option<u64>,
    pub row_count: Option<u64>,
    pub next_chunk_index: Option<u32>,
    pub data_array: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementResponse {
    pub statement_id: Option<String>,
    pub status: Option<StatementStatus>,
    pub manifest: Option<ResultManifest>,
    pub result: Option<ResultChunk>,
}

impl StatementResponse {
    pub fn remote_state(&self) -> Option<RemoteState> {
        self.status.as_ref().map(|s| s.state)
    }

    pub fn error_info(&self) -> Option<&StatementErrorInfo> {
        self.status.as_ref().and_then(|s| s.error.as_ref())
    }
}

/// Calls the statement execution workflow needs from a warehouse.
pub trait StatementApi {
    fn submit_statement(
        &self,
        request: &SqlStatementRequest,
    ) -> impl Future<Output = Result<StatementResponse, DatabricksError>> + Send;

    fn get_statement(
        &self,
        handle: &StatementHandle,
    ) -> impl Future<Output = Result<StatementResponse, DatabricksError>> + Send;

    fn get_result_chunk(
        &self,
        handle: &StatementHandle,
        chunk_index: u32,
    ) -> impl Future<Output = Result<ResultChunk, DatabricksError>> + Send;
}

impl StatementApi for DatabricksRestClient {
    async fn submit_statement(
        &self,
        request: &SqlStatementRequest,
    ) -> Result<StatementResponse, DatabricksError> {
        let timeout = self.submit_timeout(request.server_wait);
        self.post(SQL_STATEMENTS_ENDPOINT, request, Some(timeout))
            .await
    }

    async fn get_statement(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementResponse, DatabricksError> {
        let endpoint = format!(
            "{}/{}",
            SQL_STATEMENTS_ENDPOINT,
            urlencoding::encode(handle.as_str())
        );
        self.get(&endpoint).await
    }

    async fn get_result_chunk(
        &self,
        handle: &StatementHandle,
        chunk_index: u32,
    ) -> Result<ResultChunk, DatabricksError> {
        let endpoint = format!(
            "{}/{}/result/chunks/{}",
            SQL_STATEMENTS_ENDPOINT,
            urlencoding::encode(handle.as_str()),
            chunk_index
        );
        self.get(&endpoint).await
    }
}

#[derive(Debug)]
pub struct Submission {
    pub handle: StatementHandle,
    pub initial: StatementResponse,
}

/// Submits `sql` to the warehouse. A rejection is final and is not retried.
pub async fn submit<A: StatementApi>(
    api: &A,
    sql: &str,
    warehouse_id: &str,
    budget: &ExecutionBudget,
) -> Result<Submission, DatabricksError> {
    if sql.trim().is_empty() {
        return Err(DatabricksError::InvalidInput(
            "SQL statement must not be empty".to_string(),
        ));
    }
    if warehouse_id.trim().is_empty() {
        return Err(DatabricksError::MissingWarehouse);
    }

    let request = SqlStatementRequest {
        statement: sql.to_string(),
        warehouse_id: warehouse_id.to_string(),
        disposition: "INLINE".to_string(),
        format: "JSON_ARRAY".to_string(),
        wait_timeout: budget.wait_timeout_param(),
        on_wait_timeout: "CONTINUE".to_string(),
        server_wait: budget.server_wait(),
    };

    info!(
        "Submitting statement to warehouse {} (wait {}): {}",
        warehouse_id,
        request.wait_timeout,
        preview(sql)
    );

    let initial = api
        .submit_statement(&request)
        .await
        .map_err(DatabricksError::into_submission)?;

    let statement_id = initial
        .statement_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            DatabricksError::Decode("statement response did not include a statement_id".into())
        })?;

    Ok(Submission {
        handle: StatementHandle::new(statement_id),
        initial,
    })
}

fn preview(sql: &str) -> String {
    const MAX: usize = 200;
    match sql.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}... (truncated)", &sql[..cut]),
        None => sql.to_string(),
    }
}
