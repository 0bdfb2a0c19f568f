use std::env;

use async_trait::async_trait;
use clickhouse::Client;
use tokio::io::AsyncBufReadExt;

use super::{
    decode_json_row, ColumnInfo, IdentifierCase, Records, WarehouseClient, WarehouseError,
};

fn read_env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Builds a client from `CLICKHOUSE_URL`, `CLICKHOUSE_USER`,
/// `CLICKHOUSE_PASSWORD` and `CLICKHOUSE_DATABASE`.
pub fn try_get_client() -> Option<Client> {
    let url = read_env_var("CLICKHOUSE_URL")?;
    let user = read_env_var("CLICKHOUSE_USER")?;
    let password = read_env_var("CLICKHOUSE_PASSWORD").unwrap_or_default();
    let database = read_env_var("CLICKHOUSE_DATABASE").unwrap_or_else(|| "default".to_string());

    log::info!("Using ClickHouse at {} (database {})", url, database);
    Some(
        Client::default()
            .with_url(url)
            .with_user(user)
            .with_password(password)
            .with_database(database)
            // 64-bit integers as JSON numbers, not quoted strings
            .with_option("output_format_json_quote_64bit_integers", "0"),
    )
}

pub struct ClickHouseWarehouse {
    client: Client,
    identifier_case: IdentifierCase,
}

impl ClickHouseWarehouse {
    pub fn new(client: Client, identifier_case: IdentifierCase) -> Self {
        Self {
            client,
            identifier_case,
        }
    }

    pub fn from_env(identifier_case: IdentifierCase) -> Option<Self> {
        try_get_client().map(|client| Self::new(client, identifier_case))
    }
}

impl ClickHouseWarehouse {
    /// Streams the JSONEachRow lines of `sql`, skipping blank ones.
    async fn fetch_lines(&self, sql: &str) -> Result<Vec<String>, WarehouseError> {
        let mut lines = self
            .client
            .query(sql)
            .fetch_bytes("JSONEachRow")
            .map_err(|e| {
                log::error!("ClickHouse query failed. SQL was:\n{}\nError: {}", sql, e);
                WarehouseError::query(sql, e)
            })?
            .lines();

        let mut collected = Vec::new();
        while let Some(line) = lines.next_line().await.map_err(|e| {
            log::error!(
                "ClickHouse response parsing failed. SQL was:\n{}\nError: {}",
                sql,
                e
            );
            WarehouseError::query(sql, e)
        })? {
            if !line.is_empty() {
                collected.push(line);
            }
        }
        Ok(collected)
    }
}

#[async_trait]
impl WarehouseClient for ClickHouseWarehouse {
    async fn run(&self, sql: &str) -> Result<Records, WarehouseError> {
        let lines = self.fetch_lines(sql).await?;
        lines
            .iter()
            .map(|line| decode_json_row(line, self.identifier_case))
            .collect()
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, WarehouseError> {
        let query = system_columns_query(table);
        log::debug!("Querying columns for table {}: {}", table, query);

        let lines = self
            .fetch_lines(&query)
            .await
            .map_err(|e| WarehouseError::Describe {
                table: table.to_string(),
                message: e.to_string(),
            })?;
        let columns = parse_system_columns(table, lines.iter().map(String::as_str))?;

        log::debug!("Found {} columns for {}", columns.len(), table);
        Ok(columns)
    }

    fn identifier_case(&self) -> IdentifierCase {
        self.identifier_case
    }
}

/// `system.columns` rows keep ClickHouse's own `name`/`type` keys whatever
/// identifier policy applies to data rows. A table without columns is
/// reported rather than discovered as empty.
fn parse_system_columns<'a, I>(table: &str, lines: I) -> Result<Vec<ColumnInfo>, WarehouseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let describe = |message: String| WarehouseError::Describe {
        table: table.to_string(),
        message,
    };
    let columns = lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<ColumnInfo>(line).map_err(|e| describe(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(describe("table not found or has no columns".to_string()));
    }
    Ok(columns)
}

/// `db.table` is looked up in `db`; a bare name in the session database.
fn system_columns_query(table: &str) -> String {
    let (database, table) = match table.split_once('.') {
        Some((db, t)) => (format!("'{}'", db.replace('\'', "''")), t),
        None => ("currentDatabase()".to_string(), table),
    };
    format!(
        "SELECT name, type FROM system.columns WHERE database = {} AND table = '{}' ORDER BY position",
        database,
        table.replace('\'', "''")
    )
}
