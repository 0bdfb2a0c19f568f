use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Failed to read catalog file `{path}`: {error}")]
    ConfigReadError { path: String, error: String },
    #[error("Failed to parse catalog: {error}")]
    ConfigParseError { error: String },
    #[error("Invalid catalog: {message}")]
    InvalidConfig { message: String },
    #[error("column `{column}` of model `{model}` is missing from the dbt catalog")]
    MissingColumnType { model: String, column: String },
    #[error("model `{unique_id}` is not in the dbt catalog")]
    MissingCatalogNode { unique_id: String },
    #[error("Column discovery failed for `{table}`: {error}")]
    DiscoveryError { table: String, error: String },
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CatalogError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CatalogError::InvalidConfig {
            message: message.into(),
        }
    }
}
