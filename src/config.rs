use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

use crate::catalog::{CatalogFormat, CatalogSource, TypeDialect};
use crate::warehouse::IdentifierCase;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {message}")]
    Parse {
        field: String,
        value: String,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Server configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// YAML catalog file, or dbt project directory
    #[validate(length(min = 1, message = "Catalog path cannot be empty"))]
    pub catalog_path: String,

    pub catalog_format: CatalogFormat,

    /// Overrides the type dialect recorded in the catalog
    pub type_dialect: Option<TypeDialect>,

    /// Case folding applied to identifiers in SQL and result keys
    pub identifier_case: IdentifierCase,

    /// Extra wait before a relation batch is claimed; 0 relies on
    /// cooperative yields alone
    #[validate(range(max = 1000, message = "Batch delay must be between 0 and 1000 ms"))]
    pub batch_delay_ms: u64,

    #[validate(range(
        min = 1,
        max = 3600,
        message = "Request timeout must be between 1 and 3600 seconds"
    ))]
    pub request_timeout_secs: u64,

    /// Whether `GET /graphql` serves the GraphiQL page
    pub graphiql: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            catalog_path: "catalog.yaml".to_string(),
            catalog_format: CatalogFormat::Yaml,
            type_dialect: None,
            identifier_case: IdentifierCase::Preserve,
            batch_delay_ms: 0,
            request_timeout_secs: 30,
            graphiql: true,
        }
    }
}

impl ServerConfig {
    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            http_host: cli.http_host,
            http_port: cli.http_port,
            catalog_path: cli.catalog_path,
            catalog_format: cli.catalog_format,
            type_dialect: cli.type_dialect,
            identifier_case: cli.identifier_case,
            batch_delay_ms: cli.batch_delay_ms,
            request_timeout_secs: cli.request_timeout_secs,
            graphiql: cli.graphiql,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file; missing keys take their defaults
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content.clone(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn catalog_source(&self) -> CatalogSource {
        CatalogSource {
            path: self.catalog_path.clone().into(),
            format: self.catalog_format,
            dialect: self.type_dialect,
        }
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub http_host: String,
    pub http_port: u16,
    pub catalog_path: String,
    pub catalog_format: CatalogFormat,
    pub type_dialect: Option<TypeDialect>,
    pub identifier_case: IdentifierCase,
    pub batch_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub graphiql: bool,
}
