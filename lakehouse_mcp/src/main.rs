use clap::{Parser, Subcommand};
use eyre::Result;
use lakehouse_integrations::DatabricksRestClient;
use lakehouse_mcp::config::{Config, ConfigOverrides};
use lakehouse_mcp::providers::DatabricksProvider;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lakehouse_mcp")]
#[command(about = "Lakehouse MCP Server for Databricks SQL and Unity Catalog", long_about = None)]
struct Cli {
    /// Seconds between status checks of a running statement
    #[arg(long = "poll-interval-secs", env = "LAKEHOUSE_POLL_INTERVAL_SECS")]
    poll_interval_secs: Option<u64>,

    /// Status checks before a running query is reported as still running
    #[arg(long = "max-poll-attempts", env = "LAKEHOUSE_MAX_POLL_ATTEMPTS")]
    max_poll_attempts: Option<u32>,

    /// Server-side wait for the lineage query (0 or 5..=50)
    #[arg(long = "lineage-wait-secs", env = "LAKEHOUSE_LINEAGE_WAIT_SECS")]
    lineage_wait_secs: Option<u64>,

    /// Seconds between status checks of a running lineage query
    #[arg(long = "lineage-poll-interval-secs", env = "LAKEHOUSE_LINEAGE_POLL_INTERVAL_SECS")]
    lineage_poll_interval_secs: Option<u64>,

    /// Status checks after the lineage query's server-side wait
    #[arg(long = "lineage-max-poll-attempts", env = "LAKEHOUSE_LINEAGE_MAX_POLL_ATTEMPTS")]
    lineage_max_poll_attempts: Option<u32>,

    /// Timeout of a single HTTP request to Databricks
    #[arg(long = "http-timeout-secs", env = "LAKEHOUSE_HTTP_TIMEOUT_SECS")]
    http_timeout_secs: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check credentials and the configured SQL warehouse
    Check,
}

fn build_overrides_from_cli(cli: &Cli) -> ConfigOverrides {
    ConfigOverrides {
        poll_interval_secs: cli.poll_interval_secs,
        max_poll_attempts: cli.max_poll_attempts,
        lineage_wait_secs: cli.lineage_wait_secs,
        lineage_poll_interval_secs: cli.lineage_poll_interval_secs,
        lineage_max_poll_attempts: cli.lineage_max_poll_attempts,
        http_timeout_secs: cli.http_timeout_secs,
    }
}

/// stdout belongs to the MCP transport, so logs go to a file or stderr
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<String>> {
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;

            tracing_subscriber::fmt()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();

            Ok(Some(path.display().to_string()))
        }
        None if std::env::var("RUST_LOG").is_ok() => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
        None => Ok(None),
    }
}

/// check credentials and warehouse reachability
async fn check_environment(config: &Config) -> Result<()> {
    println!("🔍 Checking environment configuration...\n");

    let mut all_passed = true;

    print!("  Databricks credentials... ");
    let settings = match config.databricks_settings() {
        Ok(settings) => {
            println!("✓");
            println!("    DATABRICKS_HOST: {}", settings.host);
            println!("    DATABRICKS_TOKEN: [set]");
            Some(settings)
        }
        Err(e) => {
            println!("✗\n    Error: {}", e);
            all_passed = false;
            None
        }
    };

    println!(
        "  Query budget: {} checks every {}s",
        config.query_budget.max_poll_attempts,
        config.query_budget.poll_interval.as_secs()
    );
    println!(
        "  Lineage budget: {}s server-side wait, {} follow-up checks every {}s",
        config.lineage_budget.wait_timeout.as_secs(),
        config.lineage_budget.max_poll_attempts,
        config.lineage_budget.poll_interval.as_secs()
    );

    if let Some(settings) = settings {
        print!("  SQL warehouse... ");
        match settings.warehouse_id.clone() {
            None => println!("⚠ DATABRICKS_SQL_WAREHOUSE_ID not set (SQL and lineage tools disabled)"),
            Some(warehouse_id) => {
                let client = DatabricksRestClient::new(settings)
                    .map_err(|e| eyre::eyre!("Failed to create Databricks client: {}", e))?;
                match client.get_warehouse(&warehouse_id).await {
                    Ok(warehouse) => println!(
                        "✓\n    {} ({}): {}",
                        warehouse.name.as_deref().unwrap_or("unnamed"),
                        warehouse.id,
                        warehouse.state.as_deref().unwrap_or("UNKNOWN")
                    ),
                    Err(e) => {
                        println!("✗\n    Error: {}", e);
                        all_passed = false;
                    }
                }
            }
        }
    }

    println!();

    if all_passed {
        println!("✅ All checks passed!");
        Ok(())
    } else {
        println!("❌ Some checks failed. Please review the errors above.");
        Err(eyre::eyre!("Environment check failed"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::default().apply_override(build_overrides_from_cli(&cli));
    config.validate()?;

    match cli.command {
        Some(Commands::Check) => check_environment(&config).await,
        None => run_server(config, cli.log_file.as_ref()).await,
    }
}

async fn run_server(config: Config, log_file: Option<&PathBuf>) -> Result<()> {
    let log_path = init_tracing(log_file)?;

    let provider = DatabricksProvider::new(config.clone()).map_err(|e| {
        eyre::eyre!(
            "{}\nSet DATABRICKS_HOST and DATABRICKS_TOKEN (environment or .env file)",
            e
        )
    })?;

    let warehouse = std::env::var("DATABRICKS_SQL_WAREHOUSE_ID")
        .ok()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| "not set (SQL and lineage tools disabled)".to_string());
    let log_info = match &log_path {
        Some(path) => format!("\n Logs: {}", path),
        None => String::new(),
    };

    // print startup banner to stderr (won't interfere with stdio MCP transport)
    eprintln!(
        "🚀 Lakehouse MCP Server v{} - Databricks SQL and Unity Catalog tools\n\
         SQL warehouse: {}\n\
         Query budget: {} checks every {}s{}\n\
         Server running on stdio transport...",
        env!("CARGO_PKG_VERSION"),
        warehouse,
        config.query_budget.max_poll_attempts,
        config.query_budget.poll_interval.as_secs(),
        log_info
    );

    tracing::info!("Starting MCP server on stdio");
    let service = provider.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
