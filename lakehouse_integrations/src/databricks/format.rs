use super::{DatabricksError, ExecutionError, ExecutionOutcome, TabularResult};
use crate::ToolResultDisplay;

const NULL_MARKER: &str = "NULL";
const NO_ROWS: &str = "_No rows returned._";
const NO_COLUMNS: &str = "Statement executed successfully. The result has no columns.";

/// Makes a cell safe to place inside a Markdown table row.
fn escape_cell(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

/// Text that reads as the NULL marker once surrounding quotes are ignored.
fn null_lookalike(text: &str) -> bool {
    text.trim_matches('"') == NULL_MARKER
}

fn render_cell(cell: &Option<String>) -> String {
    match cell {
        None => NULL_MARKER.to_string(),
        // quoted with inner quotes escaped, so `NULL` and `"NULL"` stay apart
        Some(text) if null_lookalike(text) => {
            format!("\"{}\"", escape_cell(text).replace('"', "\\\""))
        }
        Some(text) => escape_cell(text),
    }
}

fn render_row(cells: impl Iterator<Item = String>) -> String {
    let cells: Vec<String> = cells.collect();
    format!("| {} |", cells.join(" | "))
}

impl ToolResultDisplay for TabularResult {
    fn display(&self) -> String {
        if self.columns.is_empty() {
            return NO_COLUMNS.to_string();
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 4);
        lines.push(render_row(self.columns.iter().map(|c| escape_cell(&c.name))));
        lines.push(render_row(self.columns.iter().map(|_| "---".to_string())));

        if self.rows.is_empty() {
            lines.push(NO_ROWS.to_string());
        } else {
            for row in &self.rows {
                lines.push(render_row(row.iter().map(render_cell)));
            }
        }

        if self.truncated {
            lines.push(String::new());
            lines.push(format!(
                "_Result truncated by the warehouse after {} rows._",
                self.rows.len()
            ));
        }

        lines.join("\n")
    }
}

impl ToolResultDisplay for ExecutionError {
    fn display(&self) -> String {
        match &self.error_code {
            Some(code) => format!("Statement {} [{}]: {}", self.state.label(), code, self.message),
            None => format!("Statement {}: {}", self.state.label(), self.message),
        }
    }
}

impl ToolResultDisplay for ExecutionOutcome {
    fn display(&self) -> String {
        match self {
            Self::Table(table) => table.display(),
            Self::Failed(error) => error.display(),
            Self::TimedOut {
                statement_id,
                attempts,
                waited,
            } => format!(
                "Statement {} did not finish after {} status checks ({}s). \
                 It may still be running on the warehouse and was not cancelled.",
                statement_id,
                attempts,
                waited.as_secs()
            ),
            Self::Abandoned { statement_id } => format!(
                "Stopped waiting for statement {} because the request was cancelled. \
                 It may still be running on the warehouse.",
                statement_id
            ),
        }
    }
}

impl ToolResultDisplay for DatabricksError {
    fn display(&self) -> String {
        match self {
            Self::Submission {
                error_code: Some(code),
                message,
                ..
            } => format!("Statement was rejected [{}]: {}", code, message),
            Self::Submission { message, .. } => format!("Statement was rejected: {}", message),
            Self::Transport(detail) => format!("Could not reach Databricks: {}", detail),
            other => format!("Error executing SQL query: {}", other),
        }
    }
}

impl ToolResultDisplay for Result<ExecutionOutcome, DatabricksError> {
    fn display(&self) -> String {
        match self {
            Ok(outcome) => outcome.display(),
            Err(e) => e.display(),
        }
    }
}
