//! Warehouse access.
//!
//! The engine only needs one capability from a backend: run a SQL string and
//! hand back flat records. Everything backend specific (connection handling,
//! wire format, identifier folding) stays behind [`WarehouseClient`].

pub mod clickhouse_client;
pub mod errors;
pub mod recording;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use clickhouse_client::ClickHouseWarehouse;
pub use errors::WarehouseError;
pub use recording::RecordingWarehouse;

/// One flat result row keyed by normalized column name.
pub type Record = Map<String, Value>;
pub type Records = Vec<Record>;

/// How a backend folds unquoted identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierCase {
    #[default]
    Preserve,
    Upper,
    Lower,
}

impl IdentifierCase {
    /// Applied to every identifier the compiler emits and to every column
    /// name a decoder reads back, so both sides agree on record keys.
    pub fn normalize(&self, identifier: &str) -> String {
        match self {
            IdentifierCase::Preserve => identifier.to_string(),
            IdentifierCase::Upper => identifier.to_uppercase(),
            IdentifierCase::Lower => identifier.to_lowercase(),
        }
    }
}

impl FromStr for IdentifierCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "preserve" => Ok(IdentifierCase::Preserve),
            "upper" => Ok(IdentifierCase::Upper),
            "lower" => Ok(IdentifierCase::Lower),
            other => Err(format!(
                "unknown identifier case '{}', expected preserve, upper or lower",
                other
            )),
        }
    }
}

/// Column metadata as reported by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Runs one statement. Rows come back in backend order.
    async fn run(&self, sql: &str) -> Result<Records, WarehouseError>;

    /// Lists the columns of `table` in declaration order.
    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, WarehouseError>;

    fn identifier_case(&self) -> IdentifierCase;
}

/// Stand-in used when no connection settings are present.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredWarehouse {
    pub identifier_case: IdentifierCase,
}

#[async_trait]
impl WarehouseClient for UnconfiguredWarehouse {
    async fn run(&self, _sql: &str) -> Result<Records, WarehouseError> {
        Err(WarehouseError::NotConfigured)
    }

    async fn table_columns(&self, _table: &str) -> Result<Vec<ColumnInfo>, WarehouseError> {
        Err(WarehouseError::NotConfigured)
    }

    fn identifier_case(&self) -> IdentifierCase {
        self.identifier_case
    }
}

/// Decodes one JSON object per line into records, normalizing keys.
pub fn decode_json_rows<'a, I>(lines: I, case: IdentifierCase) -> Result<Records, WarehouseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut records = Records::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        records.push(decode_json_row(line, case)?);
    }
    Ok(records)
}

pub fn decode_json_row(line: &str, case: IdentifierCase) -> Result<Record, WarehouseError> {
    match serde_json::from_str::<Value>(line).map_err(WarehouseError::decode)? {
        Value::Object(row) => Ok(normalize_record(row, case)),
        other => Err(WarehouseError::decode(format!(
            "expected a JSON object per row, got {}",
            other
        ))),
    }
}

pub fn normalize_record(row: Record, case: IdentifierCase) -> Record {
    if case == IdentifierCase::Preserve {
        return row;
    }
    row.into_iter()
        .map(|(key, value)| (case.normalize(&key), value))
        .collect()
}
