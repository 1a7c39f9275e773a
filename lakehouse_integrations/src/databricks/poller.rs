use super::statement::RemoteState;
use super::{DatabricksError, ExecutionBudget, StatementApi, StatementHandle, StatementResponse};
use log::{debug, info};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Local view of a statement's lifecycle.
///
/// `TimedOut` never comes from the warehouse: the poller enters it when the
/// attempt budget runs out while the statement is still pending or running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::TimedOut => "TIMED_OUT",
        }
    }
}

/// Folds one observed remote state into the current poll state.
pub fn transition(current: PollState, observed: RemoteState, attempts_remaining: u32) -> PollState {
    if current.is_terminal() {
        return current;
    }

    let next = match observed {
        RemoteState::Pending => PollState::Pending,
        RemoteState::Running => PollState::Running,
        RemoteState::Succeeded => PollState::Succeeded,
        // results of a closed statement can no longer be fetched
        RemoteState::Failed | RemoteState::Closed => PollState::Failed,
        RemoteState::Canceled => PollState::Canceled,
    };

    if !next.is_terminal() && attempts_remaining == 0 {
        PollState::TimedOut
    } else {
        next
    }
}

/// How the wait for a statement ended.
#[derive(Debug)]
pub enum Completion {
    /// Terminal remote state; the payload is the last status response.
    Finished {
        state: PollState,
        response: StatementResponse,
    },
    TimedOut {
        attempts: u32,
        waited: Duration,
    },
    /// The caller went away; the statement may still be running remotely.
    Abandoned { attempts: u32 },
}

fn observed_state(response: &StatementResponse) -> Result<RemoteState, DatabricksError> {
    response
        .remote_state()
        .ok_or_else(|| DatabricksError::Decode("statement response did not include a status".into()))
}

/// Polls `handle` until it reaches a terminal state or `budget` runs out.
///
/// `initial` is the payload returned by the submission call; it is not
/// counted as a poll attempt.
pub async fn await_completion<A: StatementApi>(
    api: &A,
    handle: &StatementHandle,
    initial: StatementResponse,
    budget: &ExecutionBudget,
    cancel: &CancellationToken,
) -> Result<Completion, DatabricksError> {
    let max_attempts = budget.max_poll_attempts;
    let mut state = transition(PollState::Pending, observed_state(&initial)?, max_attempts);
    let mut latest = initial;
    let mut attempts = 0u32;
    let mut waited = Duration::ZERO;

    while !state.is_terminal() {
        if cancel.is_cancelled() {
            info!("Stopped polling statement {} after cancellation", handle);
            return Ok(Completion::Abandoned { attempts });
        }

        attempts += 1;
        debug!("Polling attempt {} for statement {}", attempts, handle);
        latest = api.get_statement(handle).await?;
        state = transition(state, observed_state(&latest)?, max_attempts - attempts);

        if !state.is_terminal() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Stopped polling statement {} after cancellation", handle);
                    return Ok(Completion::Abandoned { attempts });
                }
                _ = sleep(budget.poll_interval) => {
                    waited += budget.poll_interval;
                }
            }
        }
    }

    if state == PollState::TimedOut {
        info!(
            "Statement {} still running after {} status checks; leaving it running",
            handle, attempts
        );
        return Ok(Completion::TimedOut { attempts, waited });
    }

    debug!("Statement {} finished with state {}", handle, state.label());
    Ok(Completion::Finished {
        state,
        response: latest,
    })
}
