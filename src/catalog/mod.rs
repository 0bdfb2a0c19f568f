//! Catalog loading: turns metadata files into a validated entity model.
//!
//! Two sources are supported, a hand-written YAML catalog ([`config`]) and a
//! compiled dbt project ([`dbt`]).

pub mod config;
pub mod dbt;
pub mod errors;
pub mod type_mapping;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use config::CatalogConfig;
pub use errors::CatalogError;
pub use type_mapping::{map_type, TypeDialect};

use crate::model::Schema;
use crate::warehouse::WarehouseClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFormat {
    #[default]
    Yaml,
    Dbt,
}

impl FromStr for CatalogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(CatalogFormat::Yaml),
            "dbt" => Ok(CatalogFormat::Dbt),
            other => Err(format!("unknown catalog format '{}', expected yaml or dbt", other)),
        }
    }
}

/// Where the entity model comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSource {
    /// YAML file, or the dbt project directory
    pub path: PathBuf,
    pub format: CatalogFormat,
    /// Overrides the dialect recorded in the catalog itself
    pub dialect: Option<TypeDialect>,
}

impl CatalogSource {
    pub fn new(path: impl Into<PathBuf>, format: CatalogFormat) -> Self {
        CatalogSource {
            path: path.into(),
            format,
            dialect: None,
        }
    }
}

pub async fn load_catalog(
    source: &CatalogSource,
    warehouse: Option<&dyn WarehouseClient>,
) -> Result<Arc<Schema>, CatalogError> {
    log::info!(
        "Loading {:?} catalog from {}",
        source.format,
        source.path.display()
    );
    let schema = match source.format {
        CatalogFormat::Yaml => {
            let mut config = CatalogConfig::from_yaml_file(&source.path)?;
            if let Some(dialect) = source.dialect {
                config.type_dialect = dialect;
            }
            config.build_schema(warehouse).await?
        }
        CatalogFormat::Dbt => dbt::load_dbt_project(&source.path, source.dialect)?,
    };
    log::info!(
        "Catalog loaded: {} entities, {} relations",
        schema.len(),
        schema.relation_count()
    );
    Ok(Arc::new(schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_yaml_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "models:\n  - name: foo\n    primary_key: a\n    columns:\n      - name: a\n        type: UInt8\n",
        )
        .unwrap();

        let schema = load_catalog(&CatalogSource::new(&path, CatalogFormat::Yaml), None)
            .await
            .unwrap();
        assert_eq!(schema.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_catalog_file() {
        let source = CatalogSource::new("/nonexistent/catalog.yaml", CatalogFormat::Yaml);
        assert!(matches!(
            load_catalog(&source, None).await,
            Err(CatalogError::ConfigReadError { .. })
        ));
    }

    #[test]
    fn test_catalog_format_from_str() {
        assert_eq!("yml".parse::<CatalogFormat>(), Ok(CatalogFormat::Yaml));
        assert_eq!("DBT".parse::<CatalogFormat>(), Ok(CatalogFormat::Dbt));
        assert!("json".parse::<CatalogFormat>().is_err());
    }
}
