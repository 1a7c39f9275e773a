//! Scripted warehouse used by unit tests in place of the REST client.

use super::{
    DatabricksError, ResultChunk, SqlStatementRequest, StatementApi, StatementHandle,
    StatementResponse,
};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub(crate) fn status_response(state: &str) -> StatementResponse {
    serde_json::from_value(json!({
        "statement_id": "stmt-1",
        "status": { "state": state }
    }))
    .unwrap()
}

pub(crate) fn failed_response(state: &str, error_code: Option<&str>, message: &str) -> StatementResponse {
    serde_json::from_value(json!({
        "statement_id": "stmt-1",
        "status": {
            "state": state,
            "error": { "error_code": error_code, "message": message }
        }
    }))
    .unwrap()
}

/// A `SUCCEEDED` payload whose inline chunk holds `rows`.
pub(crate) fn succeeded_response(
    columns: &[(&str, &str)],
    rows: Value,
    total_chunk_count: u32,
    next_chunk_index: Option<u32>,
) -> StatementResponse {
    let columns: Vec<Value> = columns
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| json!({ "name": name, "type_text": ty, "type_name": ty, "position": i }))
        .collect();
    let row_count = rows.as_array().map(|r| r.len()).unwrap_or(0);
    serde_json::from_value(json!({
        "statement_id": "stmt-1",
        "status": { "state": "SUCCEEDED" },
        "manifest": {
            "format": "JSON_ARRAY",
            "schema": { "column_count": columns.len(), "columns": columns },
            "total_chunk_count": total_chunk_count
        },
        "result": {
            "chunk_index": 0,
            "row_offset": 0,
            "row_count": row_count,
            "next_chunk_index": next_chunk_index,
            "data_array": rows
        }
    }))
    .unwrap()
}

pub(crate) fn chunk(index: u32, rows: Value, next_chunk_index: Option<u32>) -> ResultChunk {
    let row_count = rows.as_array().map(|r| r.len()).unwrap_or(0);
    serde_json::from_value(json!({
        "chunk_index": index,
        "row_count": row_count,
        "next_chunk_index": next_chunk_index,
        "data_array": rows
    }))
    .unwrap()
}

#[derive(Default)]
struct Script {
    submission: Option<Result<StatementResponse, (u16, String, String)>>,
    statuses: VecDeque<StatementResponse>,
    chunks: HashMap<u32, ResultChunk>,
    requests: Vec<Value>,
    status_calls: usize,
    chunk_calls: Vec<u32>,
}

/// Replays canned responses. Status responses are consumed in order and the
/// last one repeats once the script runs out.
pub(crate) struct ScriptedWarehouse {
    script: Mutex<Script>,
}

impl ScriptedWarehouse {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
        }
    }

    pub fn submission(self, response: StatementResponse) -> Self {
        self.script.lock().unwrap().submission = Some(Ok(response));
        self
    }

    pub fn reject_submission(self, status: u16, error_code: &str, message: &str) -> Self {
        self.script.lock().unwrap().submission =
            Some(Err((status, error_code.to_string(), message.to_string())));
        self
    }

    pub fn statuses(self, statuses: Vec<StatementResponse>) -> Self {
        self.script.lock().unwrap().statuses = statuses.into();
        self
    }

    /// Registers chunks in whatever order the caller lists them.
    pub fn chunks(self, chunks: Vec<ResultChunk>) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            for chunk in chunks {
                let index = chunk.chunk_index.unwrap();
                script.chunks.insert(index, chunk);
            }
        }
        self
    }

    /// Serves `served` whenever `requested` is asked for.
    pub fn misroute_chunk(self, requested: u32, served: ResultChunk) -> Self {
        self.script.lock().unwrap().chunks.insert(requested, served);
        self
    }

    pub fn submit_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    pub fn last_request(&self) -> Option<Value> {
        self.script.lock().unwrap().requests.last().cloned()
    }

    pub fn status_calls(&self) -> usize {
        self.script.lock().unwrap().status_calls
    }

    pub fn chunk_calls(&self) -> Vec<u32> {
        self.script.lock().unwrap().chunk_calls.clone()
    }
}

impl StatementApi for ScriptedWarehouse {
    async fn submit_statement(
        &self,
        request: &SqlStatementRequest,
    ) -> Result<StatementResponse, DatabricksError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(serde_json::to_value(request).unwrap());
        match script.submission.clone() {
            Some(Ok(response)) => Ok(response),
            Some(Err((status, error_code, message))) => Err(DatabricksError::Api {
                status,
                error_code: Some(error_code),
                message,
            }),
            None => Ok(status_response("PENDING")),
        }
    }

    async fn get_statement(
        &self,
        _handle: &StatementHandle,
    ) -> Result<StatementResponse, DatabricksError> {
        let mut script = self.script.lock().unwrap();
        script.status_calls += 1;
        let next = if script.statuses.len() > 1 {
            script.statuses.pop_front()
        } else {
            script.statuses.front().cloned()
        };
        next.ok_or_else(|| DatabricksError::Transport("no scripted status".to_string()))
    }

    async fn get_result_chunk(
        &self,
        _handle: &StatementHandle,
        chunk_index: u32,
    ) -> Result<ResultChunk, DatabricksError> {
        let mut script = self.script.lock().unwrap();
        script.chunk_calls.push(chunk_index);
        script.chunks.get(&chunk_index).cloned().ok_or(DatabricksError::Api {
            status: 404,
            error_code: Some("NOT_FOUND".to_string()),
            message: format!("chunk {} not available", chunk_index),
        })
    }
}
