use serde::{Deserialize, Serialize};

/// Response of `POST /graphql/sql`: the statements a query would run.
#[derive(Debug, Serialize, Deserialize)]
pub struct SqlOnlyResponse {
    pub query: String,
    /// Statements in submission order
    pub sql: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
    pub version: String,
    pub entities: usize,
    pub relations: usize,
    pub warehouse_connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub message: String,
    pub entities: usize,
    pub relations: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
