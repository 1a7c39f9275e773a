//! Smoke test for lakehouse-mcp server
//!
//! Verifies that:
//! - Server can be instantiated in-process without a reachable workspace
//! - All tools are listed
//! - Tool failures come back as text results, not protocol errors

use eyre::Result;
use lakehouse_integrations::{DatabricksRestClient, DatabricksSettings};
use lakehouse_mcp::config::Config;
use lakehouse_mcp::providers::DatabricksProvider;
use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParam, CallToolResult, RawContent};
use rmcp_in_process_transport::in_process::TokioInProcess;

fn offline_provider() -> Result<DatabricksProvider> {
    // no warehouse configured, so nothing below reaches the network
    let settings = DatabricksSettings::new("https://example.invalid", "dapi-test", None);
    let client = DatabricksRestClient::new(settings).map_err(|e| eyre::eyre!("{}", e))?;
    Ok(DatabricksProvider::with_client(client, Config::default()))
}

fn first_text(result: &CallToolResult) -> String {
    match &result.content[0].raw {
        RawContent::Text(t) => t.text.clone(),
        _ => panic!("expected text content"),
    }
}

#[tokio::test]
async fn smoke_test_mcp_server() -> Result<()> {
    let tokio_in_process = TokioInProcess::new(offline_provider()?).await?;
    let service = ().serve(tokio_in_process).await?;

    // verify server info is available
    let server_info = service.peer_info();
    assert!(server_info.is_some(), "Server info should be available");

    let info = server_info.unwrap();
    assert_eq!(info.server_info.name, "lakehouse-mcp");
    assert!(!info.server_info.version.is_empty());

    // list tools
    let tools_response = service.list_tools(Default::default()).await?;
    for name in [
        "execute_sql_query",
        "list_uc_catalogs",
        "describe_uc_catalog",
        "describe_uc_schema",
        "describe_uc_table",
    ] {
        assert!(
            tools_response.tools.iter().any(|t| t.name == name),
            "{} tool should be exposed",
            name
        );
    }

    // cleanup
    service.cancel().await?;

    Ok(())
}

#[tokio::test]
async fn smoke_test_sql_without_warehouse_returns_text() -> Result<()> {
    let tokio_in_process = TokioInProcess::new(offline_provider()?).await?;
    let service = ().serve(tokio_in_process).await?;

    let args_map = serde_json::json!({ "sql": "SELECT 1" })
        .as_object()
        .unwrap()
        .clone();
    let result = service
        .call_tool(CallToolRequestParam {
            name: "execute_sql_query".into(),
            arguments: Some(args_map),
        })
        .await?;

    assert_eq!(result.is_error, Some(true));
    assert!(first_text(&result).contains("DATABRICKS_SQL_WAREHOUSE_ID"));

    service.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn smoke_test_blank_table_name_is_rejected() -> Result<()> {
    let tokio_in_process = TokioInProcess::new(offline_provider()?).await?;
    let service = ().serve(tokio_in_process).await?;

    let args_map = serde_json::json!({ "full_table_name": "  ", "include_lineage": true })
        .as_object()
        .unwrap()
        .clone();
    let result = service
        .call_tool(CallToolRequestParam {
            name: "describe_uc_table".into(),
            arguments: Some(args_map),
        })
        .await?;

    assert_eq!(result.is_error, Some(true));
    assert_eq!(
        first_text(&result),
        "Argument `full_table_name` must not be empty."
    );

    service.cancel().await?;
    Ok(())
}
