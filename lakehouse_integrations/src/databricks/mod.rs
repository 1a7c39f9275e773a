mod args;
mod catalog;
mod error;
mod execution;
mod format;
mod lineage;
pub mod markdown;
mod materialize;
mod poller;
mod statement;

pub use args::{
    DescribeUcCatalogArgs, DescribeUcSchemaArgs, DescribeUcTableArgs, ExecuteSqlQueryArgs,
    ListUcCatalogsArgs,
};
pub use catalog::{CatalogInfo, ColumnInfo, SchemaInfo, TableInfo};
pub use error::DatabricksError;
pub use execution::{ExecutionBudget, ExecutionError, ExecutionOutcome, execute_statement};
pub use lineage::{LineageSection, TableLineage, fetch_table_lineage, lineage_sql};
pub use materialize::{ColumnDescriptor, TabularResult, materialize};
pub use poller::{Completion, PollState, await_completion, transition};
pub use statement::{
    ManifestColumn, RemoteState, ResultChunk, ResultManifest, ResultSchema, SqlStatementRequest,
    StatementApi, StatementErrorInfo, StatementHandle, StatementResponse, StatementStatus,
    Submission, submit,
};

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Result, anyhow};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SQL_WAREHOUSES_ENDPOINT: &str = "/api/2.0/sql/warehouses";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time granted to a statement POST beyond its server-side wait.
const SUBMIT_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Connection settings, read once at startup.
#[derive(Debug, Clone)]
pub struct DatabricksSettings {
    pub host: String,
    pub token: String,
    pub warehouse_id: Option<String>,
    pub http_timeout: Duration,
}

impl DatabricksSettings {
    pub fn new(host: &str, token: &str, warehouse_id: Option<String>) -> Self {
        let host = host.trim_end_matches('/');
        let host = if host.starts_with("http") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Self {
            host,
            token: token.to_string(),
            warehouse_id: warehouse_id.filter(|id| !id.trim().is_empty()),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self> {
        let host = std::env::var("DATABRICKS_HOST")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("DATABRICKS_HOST environment variable not set"))?;
        let token = std::env::var("DATABRICKS_TOKEN")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("DATABRICKS_TOKEN environment variable not set"))?;
        let warehouse_id = std::env::var("DATABRICKS_SQL_WAREHOUSE_ID").ok();

        Ok(Self::new(&host, &token, warehouse_id))
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

/// Shape of the error body returned by Databricks REST endpoints.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseInfo {
    pub id: String,
    pub name: Option<String>,
    pub state: Option<String>,
}

/// REST client shared by every tool call; `reqwest::Client` pools connections.
pub struct DatabricksRestClient {
    settings: DatabricksSettings,
    client: reqwest::Client,
}

impl DatabricksRestClient {
    pub fn new(settings: DatabricksSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { settings, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(DatabricksSettings::from_env()?)
    }

    pub fn warehouse_id(&self) -> Option<&str> {
        self.settings.warehouse_id.as_deref()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.settings.host, endpoint)
    }

    pub(crate) async fn api_request<T>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&impl Serialize>,
        timeout: Option<Duration>,
    ) -> std::result::Result<T, DatabricksError>
    where
        T: for<'de> Deserialize<'de>,
    {
        debug!("Making {} request to {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.settings.token);

        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            info!("HTTP request failed: {}", e);
            DatabricksError::from(e)
        })?;

        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        let response_text = response.text().await.map_err(|e| {
            info!("Failed to read response text: {}", e);
            DatabricksError::from(e)
        })?;

        debug!("Response body length: {} characters", response_text.len());

        if !status.is_success() {
            info!("API request failed with status {}: {}", status, response_text);
            let parsed: Option<ApiErrorBody> = serde_json::from_str(&response_text).ok();
            let (error_code, message) = match parsed {
                Some(body) => (body.error_code, body.message.unwrap_or(response_text)),
                None => (None, response_text),
            };
            return Err(DatabricksError::Api {
                status: status.as_u16(),
                error_code,
                message,
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            info!("Failed to parse JSON response: {}. Response: {}", e, response_text);
            DatabricksError::Decode(format!("{}. Response: {}", e, response_text))
        })
    }

    pub(crate) async fn get<T>(&self, endpoint: &str) -> std::result::Result<T, DatabricksError>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.api_request(reqwest::Method::GET, &self.url(endpoint), None::<&()>, None)
            .await
    }

    pub(crate) async fn post<T>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
        timeout: Option<Duration>,
    ) -> std::result::Result<T, DatabricksError>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.api_request(reqwest::Method::POST, &self.url(endpoint), Some(body), timeout)
            .await
    }

    /// Request timeout for a statement POST that the server may hold for
    /// `server_wait`. Never shorter than the client-wide timeout.
    pub(crate) fn submit_timeout(&self, server_wait: Duration) -> Duration {
        if server_wait.is_zero() {
            return self.settings.http_timeout;
        }
        self.settings
            .http_timeout
            .max(server_wait + SUBMIT_TIMEOUT_MARGIN)
    }

    pub async fn get_warehouse(&self, warehouse_id: &str) -> Result<WarehouseInfo> {
        let endpoint = format!(
            "{}/{}",
            SQL_WAREHOUSES_ENDPOINT,
            urlencoding::encode(warehouse_id)
        );
        Ok(self.get(&endpoint).await?)
    }

    /// Runs `sql` on the configured warehouse and waits for it within `budget`.
    pub async fn execute_sql(
        &self,
        sql: &str,
        budget: &ExecutionBudget,
        cancel: &CancellationToken,
    ) -> std::result::Result<ExecutionOutcome, DatabricksError> {
        let warehouse_id = self.warehouse_id().ok_or(DatabricksError::MissingWarehouse)?;
        execute_statement(self, sql, warehouse_id, budget, cancel).await
    }
}
