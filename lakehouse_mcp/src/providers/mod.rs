pub mod databricks;

pub use databricks::DatabricksProvider;
