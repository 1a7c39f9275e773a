pub mod databricks;

// ============================================================================
// Shared Display Trait
// ============================================================================

pub trait ToolResultDisplay {
    fn display(&self) -> String;
}

pub use databricks::{
    CatalogInfo, ColumnDescriptor, ColumnInfo, DatabricksError, DatabricksRestClient,
    DatabricksSettings, DescribeUcCatalogArgs, DescribeUcSchemaArgs, DescribeUcTableArgs,
    ExecuteSqlQueryArgs, ExecutionBudget, ExecutionError, ExecutionOutcome, LineageSection,
    ListUcCatalogsArgs, PollState, SchemaInfo, StatementApi, StatementHandle, TableInfo,
    TableLineage, TabularResult, WarehouseInfo,
};
