use crate::config::Config;
use eyre::Result;
use lakehouse_integrations::databricks::{fetch_table_lineage, markdown};
use lakehouse_integrations::{
    DatabricksError, DatabricksRestClient, DescribeUcCatalogArgs, DescribeUcSchemaArgs,
    DescribeUcTableArgs, ExecuteSqlQueryArgs, ExecutionOutcome, LineageSection,
    ListUcCatalogsArgs, ToolResultDisplay,
};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData, ServerHandler, tool, tool_handler, tool_router};
use std::sync::Arc;

#[derive(Clone)]
pub struct DatabricksProvider {
    client: Arc<DatabricksRestClient>,
    config: Arc<Config>,
    tool_router: ToolRouter<Self>,
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

fn error_result(text: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text)])
}

fn missing_argument(name: &str) -> CallToolResult {
    error_result(format!("Argument `{}` must not be empty.", name))
}

/// Maps an execution result onto a tool result; only failures set `is_error`.
fn execution_result(result: std::result::Result<ExecutionOutcome, DatabricksError>) -> CallToolResult {
    let text = result.display();
    match result {
        Ok(ExecutionOutcome::Failed(_)) | Err(_) => error_result(text),
        Ok(_) => text_result(text),
    }
}

#[tool_router]
impl DatabricksProvider {
    pub fn new(config: Config) -> Result<Self> {
        let settings = config.databricks_settings()?;
        let client = DatabricksRestClient::new(settings)
            .map_err(|e| eyre::eyre!("Failed to create Databricks client: {}", e))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: DatabricksRestClient, config: Config) -> Self {
        Self {
            client: Arc::new(client),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "execute_sql_query",
        description = "Execute a SQL statement on the configured Databricks SQL warehouse and return the result as a Markdown table. Long-running statements are polled until they finish or the wait budget runs out."
    )]
    pub async fn execute_sql_query(
        &self,
        Parameters(args): Parameters<ExecuteSqlQueryArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!("execute_sql_query called");
        let result = self
            .client
            .execute_sql(&args.sql, &self.config.query_budget, &context.ct)
            .await;
        Ok(execution_result(result))
    }

    #[tool(
        name = "list_uc_catalogs",
        description = "List all Unity Catalog catalogs with their descriptions and types"
    )]
    pub async fn list_uc_catalogs(
        &self,
        Parameters(_args): Parameters<ListUcCatalogsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!("list_uc_catalogs called");
        match self.client.list_catalogs().await {
            Ok(catalogs) => Ok(text_result(markdown::catalogs_summary(&catalogs))),
            Err(e) => Ok(error_result(markdown::catalogs_error(&e.to_string()))),
        }
    }

    #[tool(
        name = "describe_uc_catalog",
        description = "Summarize a Unity Catalog catalog: the schemas it contains and their descriptions"
    )]
    pub async fn describe_uc_catalog(
        &self,
        Parameters(args): Parameters<DescribeUcCatalogArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!("describe_uc_catalog called for {}", args.catalog_name);
        let catalog_name = args.catalog_name.trim();
        if catalog_name.is_empty() {
            return Ok(missing_argument("catalog_name"));
        }

        match self.client.list_schemas(catalog_name).await {
            Ok(schemas) => Ok(text_result(markdown::catalog_summary(catalog_name, &schemas))),
            Err(e) => Ok(error_result(markdown::catalog_error(catalog_name, &e.to_string()))),
        }
    }

    #[tool(
        name = "describe_uc_schema",
        description = "Describe a Unity Catalog schema and the tables it contains, optionally with every table's columns"
    )]
    pub async fn describe_uc_schema(
        &self,
        Parameters(args): Parameters<DescribeUcSchemaArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let catalog_name = args.catalog_name.trim();
        let schema_name = args.schema_name.trim();
        if catalog_name.is_empty() {
            return Ok(missing_argument("catalog_name"));
        }
        if schema_name.is_empty() {
            return Ok(missing_argument("schema_name"));
        }

        let full_schema_name = format!("{}.{}", catalog_name, schema_name);
        tracing::info!("describe_uc_schema called for {}", full_schema_name);

        let schema = match self.client.get_schema(&full_schema_name).await {
            Ok(schema) => schema,
            Err(e) => {
                return Ok(error_result(markdown::schema_error(&full_schema_name, &e.to_string())));
            }
        };
        match self.client.list_tables(catalog_name, schema_name).await {
            Ok(tables) => Ok(text_result(markdown::schema_details(
                catalog_name,
                schema_name,
                &schema,
                &tables,
                args.include_columns,
            ))),
            Err(e) => Ok(error_result(markdown::schema_error(&full_schema_name, &e.to_string()))),
        }
    }

    #[tool(
        name = "describe_uc_table",
        description = "Describe a Unity Catalog table: description, partitioning and columns, optionally with upstream and downstream lineage"
    )]
    pub async fn describe_uc_table(
        &self,
        Parameters(args): Parameters<DescribeUcTableArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let full_table_name = args.full_table_name.trim();
        if full_table_name.is_empty() {
            return Ok(missing_argument("full_table_name"));
        }
        tracing::info!("describe_uc_table called for {}", full_table_name);

        let table = match self.client.get_table(full_table_name).await {
            Ok(table) => table,
            Err(e) => return Ok(error_result(markdown::table_error(full_table_name, &e.to_string()))),
        };

        let lineage = if args.include_lineage {
            fetch_table_lineage(
                self.client.as_ref(),
                self.client.warehouse_id(),
                &table.qualified_name(),
                &self.config.lineage_budget,
                &context.ct,
            )
            .await
        } else {
            LineageSection::Skipped
        };

        Ok(text_result(markdown::table_details(&table, &lineage)))
    }
}

#[tool_handler]
impl ServerHandler for DatabricksProvider {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "lakehouse-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Lakehouse MCP - Databricks".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "MCP server for Databricks: run SQL on a SQL warehouse and explore Unity Catalog catalogs, schemas, tables and lineage.".to_string(),
            ),
        }
    }
}
