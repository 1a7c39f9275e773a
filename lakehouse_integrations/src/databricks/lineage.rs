use super::{ExecutionBudget, ExecutionOutcome, StatementApi, TabularResult, execute_statement};
use crate::ToolResultDisplay;
use log::{info, warn};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

const LINEAGE_ROW_LIMIT: u32 = 100;

/// Builds the lineage lookup for one table.
///
/// The table name is embedded as a string literal, so quotes and backslashes
/// are escaped.
pub fn lineage_sql(table_full_name: &str) -> String {
    let literal = table_full_name.replace('\\', "\\\\").replace('\'', "''");
    format!(
        "SELECT source_table_full_name, target_table_full_name, entity_type, entity_id, created_by, event_time \
         FROM system.access.table_lineage \
         WHERE source_table_full_name = '{literal}' OR target_table_full_name = '{literal}' \
         ORDER BY event_time DESC LIMIT {LINEAGE_ROW_LIMIT}"
    )
}

/// Tables and workloads connected to one table.
///
/// All lists are sorted and de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLineage {
    /// Tables this table reads from.
    pub upstream: Vec<String>,
    /// Tables that read from this table.
    pub downstream: Vec<String>,
    pub notebooks: Vec<String>,
    pub jobs: Vec<String>,
}

impl TableLineage {
    pub fn is_empty(&self) -> bool {
        self.upstream.is_empty()
            && self.downstream.is_empty()
            && self.notebooks.is_empty()
            && self.jobs.is_empty()
    }

    /// Reduces lineage rows to the sets that concern `table_full_name`.
    pub fn from_rows(result: &TabularResult, table_full_name: &str) -> Self {
        let source = result.column_index("source_table_full_name");
        let target = result.column_index("target_table_full_name");
        let entity_type = result.column_index("entity_type");
        let entity_id = result.column_index("entity_id");

        let cell = |row: &[Option<String>], index: Option<usize>| -> Option<String> {
            index
                .and_then(|i| row.get(i).cloned().flatten())
                .filter(|v| !v.is_empty())
        };

        let mut upstream = BTreeSet::new();
        let mut downstream = BTreeSet::new();
        let mut notebooks = BTreeSet::new();
        let mut jobs = BTreeSet::new();

        for row in &result.rows {
            let source_table = cell(row, source);
            let target_table = cell(row, target);

            match (source_table, target_table) {
                (Some(s), Some(t)) if s == table_full_name && t != table_full_name => {
                    downstream.insert(t);
                }
                (Some(s), Some(t)) if t == table_full_name && s != table_full_name => {
                    upstream.insert(s);
                }
                _ => {}
            }

            if let Some(id) = cell(row, entity_id) {
                match cell(row, entity_type).as_deref() {
                    Some("NOTEBOOK") => {
                        notebooks.insert(id);
                    }
                    Some("JOB") => {
                        jobs.insert(id);
                    }
                    _ => {}
                }
            }
        }

        Self {
            upstream: upstream.into_iter().collect(),
            downstream: downstream.into_iter().collect(),
            notebooks: notebooks.into_iter().collect(),
            jobs: jobs.into_iter().collect(),
        }
    }
}

/// What the table description shows under its lineage heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageSection {
    /// Lineage was not requested.
    Skipped,
    NoWarehouse,
    Fetched(TableLineage),
    /// The lookup did not produce rows; the text explains why.
    Failed(String),
}

/// Runs the lineage lookup for `table_full_name` within `budget`.
///
/// Never fails: problems become `LineageSection::Failed` so the table
/// description can still be returned.
pub async fn fetch_table_lineage<A: StatementApi>(
    api: &A,
    warehouse_id: Option<&str>,
    table_full_name: &str,
    budget: &ExecutionBudget,
    cancel: &CancellationToken,
) -> LineageSection {
    let Some(warehouse_id) = warehouse_id else {
        return LineageSection::NoWarehouse;
    };

    info!("Fetching lineage for table: {}", table_full_name);
    let sql = lineage_sql(table_full_name);
    match execute_statement(api, &sql, warehouse_id, budget, cancel).await {
        Ok(ExecutionOutcome::Table(result)) => {
            LineageSection::Fetched(TableLineage::from_rows(&result, table_full_name))
        }
        Ok(other) => {
            warn!("Lineage lookup for {} did not complete", table_full_name);
            LineageSection::Failed(other.display())
        }
        Err(e) => {
            warn!("Lineage lookup for {} failed: {}", table_full_name, e);
            LineageSection::Failed(e.to_string())
        }
    }
}
