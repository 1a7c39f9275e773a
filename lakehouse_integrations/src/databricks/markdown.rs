//! Markdown rendering for Unity Catalog metadata.
//!
//! Every function returns a complete document; failures are rendered with
//! the `*_error` helpers so the caller always has text to hand back.

use super::{CatalogInfo, ColumnInfo, LineageSection, SchemaInfo, TableInfo, TableLineage};

const NO_DESCRIPTION: &str = "No description provided.";
const NO_COLUMNS: &str = "  - *No column information available.*";
const TABLE_SEPARATOR: &str = "\n=============\n";

pub fn catalogs_summary(catalogs: &[CatalogInfo]) -> String {
    let mut parts = vec!["# Available Unity Catalogs".to_string(), String::new()];

    if catalogs.is_empty() {
        parts.push("- *No catalogs found or accessible.*".to_string());
        return parts.join("\n");
    }

    parts.push(format!("Found {} catalog(s):", catalogs.len()));
    parts.push(String::new());

    for catalog in catalogs {
        parts.push(format!("- **`{}`**", catalog.name));
        parts.push(format!(
            "  - **Description**: {}",
            catalog.comment.as_deref().unwrap_or(NO_DESCRIPTION)
        ));
        parts.push(format!(
            "  - **Type**: `{}`",
            catalog.catalog_type.as_deref().unwrap_or("N/A")
        ));
        parts.push(String::new());
    }

    parts.join("\n")
}

pub fn catalog_summary(catalog_name: &str, schemas: &[SchemaInfo]) -> String {
    let mut parts = vec![format!("# Catalog Summary: **{}**", catalog_name), String::new()];

    if schemas.is_empty() {
        parts.push(format!("No schemas found in catalog `{}`.", catalog_name));
        return parts.join("\n");
    }

    parts.push(format!(
        "Showing top {} schemas found in catalog `{}`:",
        schemas.len(),
        catalog_name
    ));
    parts.push(String::new());

    for schema in schemas {
        parts.push(format!(
            "## {}",
            schema.full_name.as_deref().unwrap_or("Unnamed Schema")
        ));
        parts.push(
            schema
                .comment
                .as_deref()
                .map(|c| format!("**Description**: {}", c))
                .unwrap_or_default(),
        );
        parts.push(String::new());
    }

    parts.push(format!(
        "**Total Schemas Found in `{}`**: {}",
        catalog_name,
        schemas.len()
    ));
    parts.join("\n")
}

pub fn schema_details(
    catalog_name: &str,
    schema_name: &str,
    schema: &SchemaInfo,
    tables: &[TableInfo],
    include_columns: bool,
) -> String {
    let mut parts = vec![
        format!("# Schema Details: **{}.{}**", catalog_name, schema_name),
        format!(
            "**Description**: {}",
            schema.comment.as_deref().unwrap_or(NO_DESCRIPTION)
        ),
        String::new(),
        format!("## Tables in Schema `{}`", schema_name),
    ];

    if tables.is_empty() {
        parts.push("- *No tables found in this schema.*".to_string());
        return parts.join("\n");
    }

    for (i, table) in tables.iter().enumerate() {
        parts.extend(single_table(table, 3, include_columns));
        if i + 1 < tables.len() {
            parts.push(TABLE_SEPARATOR.to_string());
        } else {
            parts.push(String::new());
        }
    }

    parts.join("\n")
}

pub fn table_details(table: &TableInfo, lineage: &LineageSection) -> String {
    let mut parts = single_table(table, 1, true);
    parts.push(String::new());
    parts.push("## Lineage Information".to_string());

    match lineage {
        LineageSection::Skipped => {
            parts.push("- *Lineage fetching skipped as per request.*".to_string());
        }
        LineageSection::NoWarehouse => parts.push(
            "- *Lineage fetching skipped: `DATABRICKS_SQL_WAREHOUSE_ID` environment variable is not set.*"
                .to_string(),
        ),
        LineageSection::Fetched(found) => parts.extend(lineage_lines(found)),
        LineageSection::Failed(error) => {
            parts.push(String::new());
            parts.push("*Note: Could not retrieve complete lineage information.*".to_string());
            parts.push(format!("> *Lineage fetch error: {}*", error));
        }
    }

    parts.join("\n")
}

fn lineage_lines(lineage: &TableLineage) -> Vec<String> {
    if lineage.is_empty() {
        return vec!["- *No upstream or downstream table dependencies found.*".to_string()];
    }

    let mut lines = Vec::new();
    let mut block = |title: &str, items: &[String]| {
        if items.is_empty() {
            return;
        }
        lines.push(String::new());
        lines.push(format!("### {}", title));
        lines.extend(items.iter().map(|item| format!("- `{}`", item)));
    };

    block("Upstream Tables (tables this table reads from):", &lineage.upstream);
    block("Downstream Tables (tables that read from this table):", &lineage.downstream);
    block("Notebooks", &lineage.notebooks);
    block("Jobs", &lineage.jobs);
    lines
}

/// Heading, description, partitioning and optionally columns of one table.
///
/// `level` 1 is a standalone table page; deeper levels are used when the
/// table is nested in a schema listing and omit the "not provided" notes.
fn single_table(table: &TableInfo, level: usize, include_columns: bool) -> Vec<String> {
    let heading = "#".repeat(level);
    let sub_heading = "#".repeat(level + 1);
    let standalone = level == 1;

    let mut parts = vec![format!("{} Table: **{}**", heading, table.qualified_name())];

    match table.comment.as_deref() {
        Some(comment) => {
            parts.push(String::new());
            parts.push(format!("**Description**: {}", comment));
        }
        None if standalone => {
            parts.push(String::new());
            parts.push(format!("**Description**: {}", NO_DESCRIPTION));
        }
        None => {}
    }

    let partitions = table.partition_columns();
    if !partitions.is_empty() {
        parts.push(String::new());
        parts.push(format!("{} Partition Columns", sub_heading));
        parts.extend(partitions.iter().map(|name| format!("- `{}`", name)));
    } else if standalone {
        parts.push(String::new());
        parts.push(format!("{} Partition Columns", sub_heading));
        parts.push(
            "- *This table is not partitioned or partition key information is unavailable.*"
                .to_string(),
        );
    }

    if include_columns {
        parts.push(String::new());
        parts.push(format!("{} Table Columns", sub_heading));
        match table.columns.as_deref() {
            Some(columns) if !columns.is_empty() => {
                parts.extend(columns.iter().map(column_line));
            }
            _ => parts.push(NO_COLUMNS.to_string()),
        }
    }

    parts
}

fn column_line(column: &ColumnInfo) -> String {
    let nullable = if column.nullable.unwrap_or(false) {
        "nullable"
    } else {
        "not nullable"
    };
    let description = column
        .comment
        .as_deref()
        .map(|c| format!(": {}", c))
        .unwrap_or_default();
    format!(
        "  - **{}** (`{}`, {}){}",
        column.name,
        column.display_type(),
        nullable,
        description
    )
}

fn error_block(title: &str, subject: Option<(&str, &str)>, problem: &str, details: &str) -> String {
    let mut parts = vec![format!("# Error: Could Not Retrieve {}", title)];
    if let Some((label, value)) = subject {
        parts.push(format!("**{}:** `{}`", label, value));
    }
    parts.push(format!("**Problem:** {}", problem));
    parts.push("**Details:**".to_string());
    parts.push("```".to_string());
    parts.push(details.to_string());
    parts.push("```".to_string());
    parts.join("\n")
}

pub fn catalogs_error(details: &str) -> String {
    error_block(
        "Catalog List",
        None,
        "An error occurred while attempting to fetch the list of catalogs.",
        &format!("Failed to retrieve catalog list: {}", details),
    )
}

pub fn catalog_error(catalog_name: &str, details: &str) -> String {
    error_block(
        "Catalog Summary",
        Some(("Catalog", catalog_name)),
        "An error occurred while attempting to fetch schema information.",
        &format!(
            "Failed to retrieve schemas for catalog '{}': {}",
            catalog_name, details
        ),
    )
}

pub fn schema_error(full_schema_name: &str, details: &str) -> String {
    error_block(
        "Schema Details",
        Some(("Schema", full_schema_name)),
        "An error occurred while attempting to fetch schema information.",
        &format!(
            "Failed to retrieve details for schema '{}': {}",
            full_schema_name, details
        ),
    )
}

pub fn table_error(full_table_name: &str, details: &str) -> String {
    error_block(
        "Table Details",
        Some(("Table", full_table_name)),
        "Failed to fetch the complete metadata for this table.",
        details,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events_table() -> TableInfo {
        serde_json::from_value(json!({
            "name": "events",
            "catalog_name": "main",
            "schema_name": "web",
            "full_name": "main.web.events",
            "comment": "Click stream",
            "columns": [
                { "name": "id", "type_text": "bigint", "nullable": false, "comment": "Event id" },
                { "name": "day", "type_text": "date", "nullable": true, "partition_index": 1 },
                { "name": "region", "type_name": "STRING", "nullable": true, "partition_index": 0 }
            ]
        }))
        .unwrap()
    }

    fn bare_table(name: &str) -> TableInfo {
        serde_json::from_value(json!({
            "name": name,
            "catalog_name": "main",
            "schema_name": "web"
        }))
        .unwrap()
    }

    #[test]
    fn test_catalogs_summary() {
        let catalogs: Vec<CatalogInfo> = serde_json::from_value(json!([
            { "name": "main", "comment": "Primary", "catalog_type": "MANAGED_CATALOG" },
            { "name": "samples" }
        ]))
        .unwrap();

        let text = catalogs_summary(&catalogs);
        assert!(text.starts_with("# Available Unity Catalogs\n\nFound 2 catalog(s):"));
        assert!(text.contains("- **`main`**\n  - **Description**: Primary\n  - **Type**: `MANAGED_CATALOG`"));
        assert!(text.contains("- **`samples`**\n  - **Description**: No description provided.\n  - **Type**: `N/A`"));

        assert!(catalogs_summary(&[]).ends_with("- *No catalogs found or accessible.*"));
    }

    #[test]
    fn test_catalog_summary_counts_schemas() {
        let schemas: Vec<SchemaInfo> = serde_json::from_value(json!([
            { "name": "web", "full_name": "main.web", "comment": "Web data" },
            { "name": "raw", "full_name": "main.raw" }
        ]))
        .unwrap();

        let text = catalog_summary("main", &schemas);
        assert!(text.contains("## main.web\n**Description**: Web data"));
        assert!(text.contains("## main.raw"));
        assert!(text.ends_with("**Total Schemas Found in `main`**: 2"));
        assert_eq!(
            catalog_summary("empty", &[]),
            "# Catalog Summary: **empty**\n\nNo schemas found in catalog `empty`."
        );
    }

    #[test]
    fn test_table_details_layout() {
        let text = table_details(&events_table(), &LineageSection::Skipped);
        let expected = "\
# Table: **main.web.events**

**Description**: Click stream

## Partition Columns
- `region`
- `day`

## Table Columns
  - **id** (`bigint`, not nullable): Event id
  - **day** (`date`, nullable)
  - **region** (`STRING`, nullable)

## Lineage Information
- *Lineage fetching skipped as per request.*";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_standalone_table_notes_missing_metadata() {
        let text = table_details(&bare_table("t"), &LineageSection::NoWarehouse);
        assert!(text.contains("**Description**: No description provided."));
        assert!(text.contains("- *This table is not partitioned or partition key information is unavailable.*"));
        assert!(text.contains(NO_COLUMNS));
        assert!(text.contains("`DATABRICKS_SQL_WAREHOUSE_ID` environment variable is not set"));
    }

    #[test]
    fn test_lineage_section_rendering() {
        let lineage = TableLineage {
            upstream: vec!["main.raw.a".to_string()],
            downstream: vec![],
            notebooks: vec![],
            jobs: vec!["42".to_string()],
        };
        let text = table_details(&events_table(), &LineageSection::Fetched(lineage));
        assert!(text.contains("### Upstream Tables (tables this table reads from):\n- `main.raw.a`"));
        assert!(!text.contains("Downstream"));
        assert!(text.ends_with("### Jobs\n- `42`"));

        let text = table_details(&events_table(), &LineageSection::Fetched(TableLineage::default()));
        assert!(text.ends_with("- *No upstream or downstream table dependencies found.*"));

        let text = table_details(&events_table(), &LineageSection::Failed("timed out".to_string()));
        assert!(text.ends_with("*Note: Could not retrieve complete lineage information.*\n> *Lineage fetch error: timed out*"));
    }

    #[test]
    fn test_schema_details_nests_tables() {
        let schema: SchemaInfo =
            serde_json::from_value(json!({ "name": "web", "full_name": "main.web" })).unwrap();
        let tables = vec![events_table(), bare_table("sessions")];

        let text = schema_details("main", "web", &schema, &tables, false);
        assert!(text.starts_with("# Schema Details: **main.web**\n**Description**: No description provided."));
        assert!(text.contains("### Table: **main.web.events**"));
        assert!(text.contains("#### Partition Columns"));
        assert!(!text.contains("Table Columns"));
        assert!(text.contains(TABLE_SEPARATOR));
        // nested tables skip the "not provided" notes
        assert!(!text.contains("not partitioned"));

        let text = schema_details("main", "web", &schema, &tables, true);
        assert!(text.contains("#### Table Columns\n  - **id** (`bigint`, not nullable): Event id"));

        let text = schema_details("main", "web", &schema, &[], false);
        assert!(text.ends_with("- *No tables found in this schema.*"));
    }

    #[test]
    fn test_error_blocks() {
        let text = table_error("main.web.nope", "TABLE_DOES_NOT_EXIST");
        assert_eq!(
            text,
            "# Error: Could Not Retrieve Table Details\n**Table:** `main.web.nope`\n\
             **Problem:** Failed to fetch the complete metadata for this table.\n\
             **Details:**\n```\nTABLE_DOES_NOT_EXIST\n```"
        );
        assert!(catalogs_error("boom").contains("Failed to retrieve catalog list: boom"));
        assert!(catalog_error("main", "boom").contains("**Catalog:** `main`"));
        assert!(schema_error("main.web", "boom").contains("schema 'main.web': boom"));
    }
}
