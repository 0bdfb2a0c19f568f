/// YAML catalog format.
///
/// ```yaml
/// type_dialect: clickhouse      # how `type:` names are mapped to scalars
/// models:
///   - name: orders
///     description: One row per order
///     table: analytics.orders   # defaults to the model name
///     primary_key: order_id
///     columns:
///       - name: order_id
///         type: UInt64          # backend type name
///       - name: status
///         scalar: string        # or an explicit scalar
///     foreign_keys:
///       - model: order_items    # target model
///         on: order_id          # join column on the target
///   - name: order_items
///     primary_key: item_id
///     auto_discover_columns: true   # read columns from system.columns
/// ```
///
/// Models are registered before any foreign key, so declaration order does
/// not matter.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::type_mapping::{map_type, TypeDialect};
use crate::model::{Scalar, Schema};
use crate::warehouse::WarehouseClient;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub type_dialect: TypeDialect,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub table: Option<String>,
    pub primary_key: String,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyConfig>,
    /// Fill in undeclared columns from the warehouse
    #[serde(default)]
    pub auto_discover_columns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub scalar: Option<Scalar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    pub model: String,
    pub on: String,
}

impl ColumnConfig {
    /// An explicit scalar wins over a mapped backend type.
    fn resolve_scalar(&self, dialect: TypeDialect) -> Scalar {
        match (&self.scalar, &self.data_type) {
            (Some(scalar), _) => *scalar,
            (None, Some(data_type)) => map_type(dialect, data_type),
            (None, None) => Scalar::Text,
        }
    }
}

impl CatalogConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::ConfigReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.models.is_empty() {
            return Err(CatalogError::invalid(
                "catalog must contain at least one model",
            ));
        }
        for model in &self.models {
            if model.columns.is_empty() && !model.auto_discover_columns {
                return Err(CatalogError::invalid(format!(
                    "model `{}` declares no columns and does not enable auto_discover_columns",
                    model.name
                )));
            }
        }
        Ok(())
    }

    /// Builds the entity model. `warehouse` is only consulted for models with
    /// `auto_discover_columns`.
    pub async fn build_schema(
        &self,
        warehouse: Option<&dyn WarehouseClient>,
    ) -> Result<Schema, CatalogError> {
        self.validate()?;
        let mut schema = Schema::new();

        for model in &self.models {
            let entity = schema.add_entity(&model.name, &model.description, &model.primary_key)?;
            if let Some(table) = &model.table {
                entity.with_table(table);
            }
            for column in &model.columns {
                entity.add_column(
                    &column.name,
                    &column.description,
                    column.resolve_scalar(self.type_dialect),
                )?;
            }
            if model.auto_discover_columns {
                let table = entity.table().to_string();
                let warehouse = warehouse.ok_or_else(|| CatalogError::DiscoveryError {
                    table: table.clone(),
                    error: "no warehouse connection available".to_string(),
                })?;
                let discovered = warehouse.table_columns(&table).await.map_err(|e| {
                    CatalogError::DiscoveryError {
                        table: table.clone(),
                        error: e.to_string(),
                    }
                })?;
                log::debug!(
                    "Discovered {} columns for model {}",
                    discovered.len(),
                    model.name
                );
                for column in discovered {
                    if entity.column(&column.name).is_none() {
                        entity.add_column(
                            &column.name,
                            "",
                            map_type(self.type_dialect, &column.data_type),
                        )?;
                    }
                }
            }
        }

        for model in &self.models {
            for fk in &model.foreign_keys {
                schema.add_foreign_key(&model.name, &fk.model, &fk.on)?;
            }
        }

        schema.validate()?;
        Ok(schema)
    }
}
