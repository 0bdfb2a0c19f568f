use thiserror::Error;

/// Failures reported by a warehouse backend.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse query failed: {message}")]
    Query { sql: String, message: String },
    #[error("could not decode warehouse response: {message}")]
    Decode { message: String },
    #[error("failed to describe table `{table}`: {message}")]
    Describe { table: String, message: String },
    #[error("no warehouse connection is configured")]
    NotConfigured,
}

impl WarehouseError {
    pub fn query(sql: impl Into<String>, message: impl ToString) -> Self {
        WarehouseError::Query {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(message: impl ToString) -> Self {
        WarehouseError::Decode {
            message: message.to_string(),
        }
    }
}
