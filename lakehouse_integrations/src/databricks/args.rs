use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Tool Argument Structs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteSqlQueryArgs {
    /// The complete SQL statement to run on the configured SQL warehouse
    pub sql: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListUcCatalogsArgs {
    // No parameters needed - lists all accessible catalogs
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DescribeUcCatalogArgs {
    /// Name of the Unity Catalog to summarize (e.g. "prod")
    pub catalog_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DescribeUcSchemaArgs {
    /// Catalog containing the schema
    pub catalog_name: String,
    /// Schema to describe
    pub schema_name: String,
    /// Also list the columns of every table in the schema
    #[serde(default)]
    pub include_columns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DescribeUcTableArgs {
    /// Three-part table name: catalog.schema.table
    pub full_table_name: String,
    /// Look up upstream and downstream tables in system.access.table_lineage
    #[serde(default)]
    pub include_lineage: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_flags_default_to_false() {
        let args: DescribeUcSchemaArgs =
            serde_json::from_value(json!({ "catalog_name": "main", "schema_name": "web" })).unwrap();
        assert!(!args.include_columns);

        let args: DescribeUcTableArgs =
            serde_json::from_value(json!({ "full_table_name": "main.web.events" })).unwrap();
        assert!(!args.include_lineage);
    }

    #[test]
    fn test_list_catalogs_accepts_empty_object() {
        let _args: ListUcCatalogsArgs = serde_json::from_value(json!({})).unwrap();
    }
}
