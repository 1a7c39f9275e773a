use super::DatabricksRestClient;
use anyhow::Result;
use log::{debug, info};
use serde::Deserialize;

const UNITY_CATALOG_CATALOGS_ENDPOINT: &str = "/api/2.1/unity-catalog/catalogs";
const UNITY_CATALOG_SCHEMAS_ENDPOINT: &str = "/api/2.1/unity-catalog/schemas";
const UNITY_CATALOG_TABLES_ENDPOINT: &str = "/api/2.1/unity-catalog/tables";

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
    pub comment: Option<String>,
    pub catalog_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaInfo {
    pub full_name: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub type_text: Option<String>,
    pub type_name: Option<String>,
    pub nullable: Option<bool>,
    pub comment: Option<String>,
    pub partition_index: Option<u32>,
}

impl ColumnInfo {
    pub fn display_type(&self) -> &str {
        self.type_text
            .as_deref()
            .or(self.type_name.as_deref())
            .unwrap_or("N/A")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub catalog_name: String,
    pub schema_name: String,
    pub full_name: Option<String>,
    pub comment: Option<String>,
    pub columns: Option<Vec<ColumnInfo>>,
}

impl TableInfo {
    pub fn qualified_name(&self) -> String {
        self.full_name
            .clone()
            .unwrap_or_else(|| format!("{}.{}.{}", self.catalog_name, self.schema_name, self.name))
    }

    /// Partition column names ordered by partition index.
    pub fn partition_columns(&self) -> Vec<&str> {
        let mut partitioned: Vec<(&str, u32)> = self
            .columns
            .iter()
            .flatten()
            .filter_map(|c| c.partition_index.map(|i| (c.name.as_str(), i)))
            .collect();
        partitioned.sort_by_key(|(_, index)| *index);
        partitioned.into_iter().map(|(name, _)| name).collect()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogsListResponse {
    catalogs: Option<Vec<CatalogInfo>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SchemasListResponse {
    schemas: Option<Vec<SchemaInfo>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TablesListResponse {
    tables: Option<Vec<TableInfo>>,
    next_page_token: Option<String>,
}

fn with_query(endpoint: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return endpoint.to_string();
    }
    let query: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();
    format!("{}?{}", endpoint, query.join("&"))
}

fn page_params<'a>(
    mut params: Vec<(&'a str, &'a str)>,
    token: &'a Option<String>,
) -> Vec<(&'a str, &'a str)> {
    if let Some(token) = token.as_deref().filter(|t| !t.is_empty()) {
        params.push(("page_token", token));
    }
    params
}

fn has_next(token: &Option<String>) -> bool {
    token.as_deref().is_some_and(|t| !t.is_empty())
}

impl DatabricksRestClient {
    pub async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>> {
        let mut all_catalogs = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let url = with_query(
                UNITY_CATALOG_CATALOGS_ENDPOINT,
                &page_params(Vec::new(), &next_page_token),
            );
            let response: CatalogsListResponse = self.get(&url).await?;
            all_catalogs.extend(response.catalogs.unwrap_or_default());

            if !has_next(&response.next_page_token) {
                break;
            }
            next_page_token = response.next_page_token;
        }

        info!("Found {} catalogs", all_catalogs.len());
        Ok(all_catalogs)
    }

    pub async fn list_schemas(&self, catalog_name: &str) -> Result<Vec<SchemaInfo>> {
        debug!("Listing schemas for catalog: {}", catalog_name);
        let mut all_schemas = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let url = with_query(
                UNITY_CATALOG_SCHEMAS_ENDPOINT,
                &page_params(vec![("catalog_name", catalog_name)], &next_page_token),
            );
            let response: SchemasListResponse = self.get(&url).await?;
            all_schemas.extend(response.schemas.unwrap_or_default());

            if !has_next(&response.next_page_token) {
                break;
            }
            next_page_token = response.next_page_token;
        }

        info!("Found {} schemas in {}", all_schemas.len(), catalog_name);
        Ok(all_schemas)
    }

    pub async fn get_schema(&self, full_name: &str) -> Result<SchemaInfo> {
        let url = format!(
            "{}/{}",
            UNITY_CATALOG_SCHEMAS_ENDPOINT,
            urlencoding::encode(full_name)
        );
        Ok(self.get(&url).await?)
    }

    pub async fn list_tables(&self, catalog_name: &str, schema_name: &str) -> Result<Vec<TableInfo>> {
        debug!("Listing tables for {}.{}", catalog_name, schema_name);
        let mut tables = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let url = with_query(
                UNITY_CATALOG_TABLES_ENDPOINT,
                &page_params(
                    vec![("catalog_name", catalog_name), ("schema_name", schema_name)],
                    &next_page_token,
                ),
            );
            let response: TablesListResponse = self.get(&url).await?;
            tables.extend(response.tables.unwrap_or_default());

            if !has_next(&response.next_page_token) {
                break;
            }
            next_page_token = response.next_page_token;
        }

        info!("Found {} tables in {}.{}", tables.len(), catalog_name, schema_name);
        Ok(tables)
    }

    pub async fn get_table(&self, full_name: &str) -> Result<TableInfo> {
        let url = format!(
            "{}/{}",
            UNITY_CATALOG_TABLES_ENDPOINT,
            urlencoding::encode(full_name)
        );
        Ok(self.get(&url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_query_encodes_values() {
        assert_eq!(with_query("/x", &[]), "/x");
        assert_eq!(
            with_query("/x", &[("catalog_name", "my cat"), ("page_token", "a/b")]),
            "/x?catalog_name=my%20cat&page_token=a%2Fb"
        );
    }

    #[test]
    fn test_page_params_skips_empty_token() {
        let none: Option<String> = None;
        assert_eq!(page_params(vec![("a", "1")], &none), vec![("a", "1")]);
        let empty = Some(String::new());
        assert_eq!(page_params(vec![], &empty), Vec::<(&str, &str)>::new());
        let token = Some("tok".to_string());
        assert_eq!(page_params(vec![], &token), vec![("page_token", "tok")]);
        assert!(!has_next(&empty));
    }

    #[test]
    fn test_table_info_partition_columns_sorted() {
        let table: TableInfo = serde_json::from_value(json!({
            "name": "events",
            "catalog_name": "main",
            "schema_name": "web",
            "columns": [
                { "name": "id", "type_text": "bigint", "nullable": false },
                { "name": "day", "type_text": "date", "partition_index": 1 },
                { "name": "region", "type_text": "string", "partition_index": 0 }
            ]
        }))
        .unwrap();

        assert_eq!(table.qualified_name(), "main.web.events");
        assert_eq!(table.partition_columns(), vec!["region", "day"]);
        let columns = table.columns.unwrap();
        assert_eq!(columns[0].display_type(), "bigint");
    }

    #[test]
    fn test_column_display_type_fallbacks() {
        let column: ColumnInfo =
            serde_json::from_value(json!({ "name": "c", "type_name": "INT" })).unwrap();
        assert_eq!(column.display_type(), "INT");
        let column: ColumnInfo = serde_json::from_value(json!({ "name": "c" })).unwrap();
        assert_eq!(column.display_type(), "N/A");
    }

    #[test]
    fn test_full_api_payloads_still_parse() {
        let schema: SchemaInfo = serde_json::from_value(json!({
            "name": "web",
            "catalog_name": "main",
            "full_name": "main.web",
            "comment": "clickstream",
            "owner": "data-eng"
        }))
        .unwrap();
        assert_eq!(schema.full_name.as_deref(), Some("main.web"));

        let table: TableInfo = serde_json::from_value(json!({
            "name": "events",
            "catalog_name": "main",
            "schema_name": "web",
            "table_type": "MANAGED",
            "data_source_format": "DELTA",
            "columns": [{ "name": "id", "type_text": "bigint", "position": 0 }]
        }))
        .unwrap();
        assert_eq!(table.qualified_name(), "main.web.events");
        assert_eq!(table.columns.unwrap()[0].name, "id");
    }
}
