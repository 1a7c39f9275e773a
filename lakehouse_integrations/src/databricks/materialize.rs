use super::statement::ResultChunk;
use super::{DatabricksError, StatementApi, StatementHandle, StatementResponse};
use log::{debug, warn};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_name: String,
}

/// Fully materialized statement result. Every row holds exactly one cell per
/// column; `None` is SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Set when the warehouse cut the result short (row or byte limit).
    pub truncated: bool,
}

impl TabularResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn append_chunk(&mut self, chunk: ResultChunk) -> Result<(), DatabricksError> {
        let data = chunk.data_array.unwrap_or_default();
        if let Some(expected) = chunk.row_count {
            if expected != data.len() as u64 {
                warn!(
                    "Chunk {:?} reports {} rows but carries {}",
                    chunk.chunk_index,
                    expected,
                    data.len()
                );
            }
        }

        for row in data {
            if row.len() != self.columns.len() {
                return Err(DatabricksError::RowShape {
                    row: self.rows.len(),
                    cells: row.len(),
                    columns: self.columns.len(),
                });
            }
            self.rows.push(row.into_iter().map(cell_text).collect());
        }
        Ok(())
    }
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Assembles the result of a `SUCCEEDED` statement.
///
/// The inline chunk of `response` comes first; remaining chunks are fetched
/// one at a time following `next_chunk_index`, each exactly once.
pub async fn materialize<A: StatementApi>(
    api: &A,
    handle: &StatementHandle,
    response: StatementResponse,
) -> Result<TabularResult, DatabricksError> {
    let manifest = response.manifest.unwrap_or_default();
    let columns = manifest
        .schema
        .map(|schema| schema.columns)
        .unwrap_or_default()
        .into_iter()
        .map(|column| ColumnDescriptor {
            type_name: column
                .type_text
                .or(column.type_name)
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            name: column.name,
        })
        .collect();

    let mut table = TabularResult {
        columns,
        rows: Vec::new(),
        truncated: manifest.truncated,
    };

    let mut received = 0u32;
    let mut next = match response.result {
        Some(first) => {
            let index = first.chunk_index.unwrap_or(0);
            if index != 0 {
                return Err(DatabricksError::ChunkOrder {
                    requested: 0,
                    received: index,
                });
            }
            let next = first.next_chunk_index;
            table.append_chunk(first)?;
            received += 1;
            next
        }
        None if manifest.total_chunk_count.unwrap_or(0) > 0 => Some(0),
        None => None,
    };

    while let Some(index) = next {
        // strictly ascending, no gaps, no repeats
        if index != received {
            return Err(DatabricksError::ChunkOrder {
                requested: received,
                received: index,
            });
        }

        debug!("Fetching result chunk {} for statement {}", index, handle);
        let chunk = api.get_result_chunk(handle, index).await?;
        if let Some(actual) = chunk.chunk_index {
            if actual != index {
                return Err(DatabricksError::ChunkOrder {
                    requested: index,
                    received: actual,
                });
            }
        }

        next = chunk.next_chunk_index;
        table.append_chunk(chunk)?;
        received += 1;
    }

    if let Some(expected) = manifest.total_chunk_count {
        // empty results may still carry an empty inline chunk
        let empty_result = expected == 0 && table.rows.is_empty();
        if received != expected && !empty_result {
            return Err(DatabricksError::MissingChunks { expected, received });
        }
    }

    if let Some(total) = manifest.total_row_count {
        if total != table.rows.len() as u64 {
            warn!(
                "Statement {} declares {} rows but {} were materialized",
                handle,
                total,
                table.rows.len()
            );
        }
    }

    debug!(
        "Materialized {} rows x {} columns from {} chunks",
        table.rows.len(),
        table.columns.len(),
        received
    );
    Ok(table)
}
