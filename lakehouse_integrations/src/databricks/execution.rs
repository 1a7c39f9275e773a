use super::poller::{Completion, PollState, await_completion};
use super::{DatabricksError, StatementApi, TabularResult, materialize, submit};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Server-side wait limits accepted by the statement API: `0s` or `5s..=50s`.
const MIN_WAIT_TIMEOUT_SECS: u64 = 5;
const MAX_WAIT_TIMEOUT_SECS: u64 = 50;

/// Latency tolerance for one execution path.
///
/// Query execution and lineage lookups each get their own budget so that
/// tuning one never changes the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionBudget {
    /// How long the submission call itself waits on the server.
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Status checks after submission before giving up with `TimedOut`.
    pub max_poll_attempts: u32,
}

impl ExecutionBudget {
    /// 60 checks, 10 seconds apart.
    pub fn query_default() -> Self {
        Self {
            wait_timeout: Duration::ZERO,
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: 60,
        }
    }

    /// A single 50 second server-side wait, no follow-up polling.
    pub fn lineage_default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(MAX_WAIT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: 0,
        }
    }

    /// `wait_timeout` clamped to what the statement API accepts.
    pub(crate) fn server_wait(&self) -> Duration {
        let secs = match self.wait_timeout.as_secs() {
            0 => 0,
            s => s.clamp(MIN_WAIT_TIMEOUT_SECS, MAX_WAIT_TIMEOUT_SECS),
        };
        Duration::from_secs(secs)
    }

    pub(crate) fn wait_timeout_param(&self) -> String {
        format!("{}s", self.server_wait().as_secs())
    }

    /// Upper bound on time spent waiting for one statement.
    pub fn ceiling(&self) -> Duration {
        self.wait_timeout + self.poll_interval * self.max_poll_attempts
    }
}

/// A statement the warehouse reported as failed, canceled or closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub state: PollState,
    pub message: String,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Table(TabularResult),
    Failed(ExecutionError),
    /// The poll budget ran out; the statement was left running.
    TimedOut {
        statement_id: String,
        attempts: u32,
        waited: Duration,
    },
    /// The caller cancelled the request while the statement was in flight.
    Abandoned { statement_id: String },
}

/// Submits `sql`, waits for it within `budget` and materializes the result.
pub async fn execute_statement<A: StatementApi>(
    api: &A,
    sql: &str,
    warehouse_id: &str,
    budget: &ExecutionBudget,
    cancel: &CancellationToken,
) -> Result<ExecutionOutcome, DatabricksError> {
    let submission = submit(api, sql, warehouse_id, budget).await?;
    let handle = submission.handle;

    let completion = await_completion(api, &handle, submission.initial, budget, cancel).await?;
    let outcome = match completion {
        Completion::Finished {
            state: PollState::Succeeded,
            response,
        } => ExecutionOutcome::Table(materialize(api, &handle, response).await?),
        Completion::Finished { state, response } => {
            let error = response.error_info();
            ExecutionOutcome::Failed(ExecutionError {
                state,
                message: error
                    .and_then(|e| e.message.clone())
                    .unwrap_or_else(|| "No error details provided.".to_string()),
                error_code: error.and_then(|e| e.error_code.clone()),
            })
        }
        Completion::TimedOut { attempts, waited } => ExecutionOutcome::TimedOut {
            statement_id: handle.to_string(),
            attempts,
            waited: waited + budget.wait_timeout,
        },
        // TODO: issue POST /api/2.0/sql/statements/{id}/cancel once the API
        // trait grows a cancel call
        Completion::Abandoned { .. } => ExecutionOutcome::Abandoned {
            statement_id: handle.to_string(),
        },
    };
    Ok(outcome)
}
