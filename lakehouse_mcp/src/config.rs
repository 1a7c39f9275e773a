use eyre::Result;
use lakehouse_integrations::{DatabricksSettings, ExecutionBudget};
use std::time::Duration;

/// Runtime configuration of the server.
///
/// Query execution and lineage lookups carry separate budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub query_budget: ExecutionBudget,
    pub lineage_budget: ExecutionBudget,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query_budget: ExecutionBudget::query_default(),
            lineage_budget: ExecutionBudget::lineage_default(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Values given on the command line or through `LAKEHOUSE_*` variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub poll_interval_secs: Option<u64>,
    pub max_poll_attempts: Option<u32>,
    pub lineage_wait_secs: Option<u64>,
    pub lineage_poll_interval_secs: Option<u64>,
    pub lineage_max_poll_attempts: Option<u32>,
    pub http_timeout_secs: Option<u64>,
}

impl Config {
    pub fn apply_override(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(secs) = overrides.poll_interval_secs {
            self.query_budget.poll_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = overrides.max_poll_attempts {
            self.query_budget.max_poll_attempts = attempts;
        }
        if let Some(secs) = overrides.lineage_wait_secs {
            self.lineage_budget.wait_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.lineage_poll_interval_secs {
            self.lineage_budget.poll_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = overrides.lineage_max_poll_attempts {
            self.lineage_budget.max_poll_attempts = attempts;
        }
        if let Some(secs) = overrides.http_timeout_secs {
            self.http_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Reads Databricks credentials from the environment.
    pub fn databricks_settings(&self) -> Result<DatabricksSettings> {
        let settings = DatabricksSettings::from_env().map_err(|e| eyre::eyre!("{}", e))?;
        Ok(settings.with_http_timeout(self.http_timeout))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, budget) in [("query", &self.query_budget), ("lineage", &self.lineage_budget)] {
            if budget.max_poll_attempts > 0 && budget.poll_interval.is_zero() {
                return Err(eyre::eyre!(
                    "{} poll interval must be at least one second when polling is enabled",
                    name
                ));
            }
        }
        if self.http_timeout.is_zero() {
            return Err(eyre::eyre!("HTTP timeout must be at least one second"));
        }
        Ok(())
    }
}
