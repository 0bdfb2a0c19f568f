//! A warehouse that never leaves the process.
//!
//! Every statement is captured in submission order and answered from canned
//! responses matched by substring. The SQL-only endpoint uses it with no
//! responses at all; tests use it to script backend behaviour.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ColumnInfo, IdentifierCase, Record, Records, WarehouseClient, WarehouseError};

#[derive(Debug, Clone)]
enum Canned {
    Rows(Records),
    Failure(String),
}

#[derive(Debug, Default)]
pub struct RecordingWarehouse {
    identifier_case: IdentifierCase,
    responses: Vec<(String, Canned)>,
    columns: HashMap<String, Vec<ColumnInfo>>,
    statements: Mutex<Vec<String>>,
}

impl RecordingWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier_case(mut self, case: IdentifierCase) -> Self {
        self.identifier_case = case;
        self
    }

    /// Answers statements containing `pattern` with `rows`. Rows given as
    /// JSON objects; anything else is skipped. First matching pattern wins.
    pub fn respond_to(mut self, pattern: impl Into<String>, rows: Vec<Value>) -> Self {
        let records = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect::<Vec<Record>>();
        self.responses
            .push((pattern.into(), Canned::Rows(records)));
        self
    }

    /// Fails statements containing `pattern`.
    pub fn fail_on(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses
            .push((pattern.into(), Canned::Failure(message.into())));
        self
    }

    pub fn with_table(mut self, table: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        self.columns.insert(table.into(), columns);
        self
    }

    /// Statements seen so far, in submission order.
    pub fn statements(&self) -> Vec<String> {
        match self.statements.lock() {
            Ok(statements) => statements.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, sql: &str) {
        match self.statements.lock() {
            Ok(mut statements) => statements.push(sql.to_string()),
            Err(poisoned) => poisoned.into_inner().push(sql.to_string()),
        }
    }
}

#[async_trait]
impl WarehouseClient for RecordingWarehouse {
    async fn run(&self, sql: &str) -> Result<Records, WarehouseError> {
        self.record(sql);
        let canned = self
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, canned)| canned.clone());
        match canned {
            Some(Canned::Rows(rows)) => Ok(rows
                .into_iter()
                .map(|row| super::normalize_record(row, self.identifier_case))
                .collect()),
            Some(Canned::Failure(message)) => Err(WarehouseError::query(sql, message)),
            None => Ok(Records::new()),
        }
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, WarehouseError> {
        self.columns
            .get(table)
            .cloned()
            .ok_or_else(|| WarehouseError::Describe {
                table: table.to_string(),
                message: "table not found".to_string(),
            })
    }

    fn identifier_case(&self) -> IdentifierCase {
        self.identifier_case
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_statements_in_order() {
        let warehouse = RecordingWarehouse::new()
            .respond_to("FROM bar", vec![json!({"x": 1}), json!({"x": 2})]);

        let rows = warehouse.run("SELECT x FROM bar LIMIT 500").await.unwrap();
        assert_eq!(rows.len(), 2);
        let rows = warehouse.run("SELECT a FROM foo LIMIT 500").await.unwrap();
        assert!(rows.is_empty());

        assert_eq!(
            warehouse.statements(),
            vec!["SELECT x FROM bar LIMIT 500", "SELECT a FROM foo LIMIT 500"]
        );
    }

    #[tokio::test]
    async fn test_canned_failure() {
        let warehouse = RecordingWarehouse::new().fail_on("FROM foo", "table is gone");
        let err = warehouse.run("SELECT * FROM foo").await.unwrap_err();
        assert!(err.to_string().contains("table is gone"));
    }

    #[tokio::test]
    async fn test_canned_rows_follow_identifier_case() {
        let warehouse = RecordingWarehouse::new()
            .with_identifier_case(IdentifierCase::Upper)
            .respond_to("FROM FOO", vec![json!({"a": 1})]);
        let rows = warehouse.run("SELECT A FROM FOO").await.unwrap();
        assert_eq!(rows[0].get("A"), Some(&json!(1)));
    }
}
