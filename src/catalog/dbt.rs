//! dbt project loading.
//!
//! Reads `target/manifest.json` and `target/catalog.json` from a dbt project
//! directory. Only models opting in through `config.meta.dal.expose` become
//! entities:
//!
//! ```yaml
//! models:
//!   - name: customers
//!     config:
//!       meta:
//!         dal:
//!           expose: true
//!           primary_key: customer_id
//!           foreign_keys:
//!             - model: orders
//!               right_on: customer_id
//! ```
//!
//! Column types come from the catalog, matched case-insensitively, and are
//! mapped with the adapter's type table.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::errors::CatalogError;
use super::type_mapping::{map_type, TypeDialect};
use crate::model::Schema;

#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub metadata: ManifestMetadata,
    #[serde(default)]
    pub nodes: BTreeMap<String, ManifestNode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub adapter_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestNode {
    pub unique_id: String,
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: HashMap<String, ManifestColumn>,
    #[serde(default)]
    pub config: NodeConfig,
}

#[derive(Debug, Deserialize)]
pub struct ManifestColumn {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeMeta {
    #[serde(default)]
    pub dal: Option<DalMeta>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DalMeta {
    #[serde(default)]
    pub expose: bool,
    #[serde(default)]
    pub primary_key: String,
    #[serde(default)]
    pub foreign_keys: Vec<DalForeignKey>,
}

#[derive(Debug, Deserialize)]
pub struct DalForeignKey {
    pub model: String,
    #[serde(default)]
    pub left_on: Option<String>,
    pub right_on: String,
}

#[derive(Debug, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub nodes: HashMap<String, CatalogNode>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogNode {
    #[serde(default)]
    pub columns: HashMap<String, CatalogColumn>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogColumn {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub index: usize,
}

impl ManifestNode {
    fn dal(&self) -> Option<&DalMeta> {
        self.config.meta.dal.as_ref()
    }

    fn is_exposed(&self) -> bool {
        self.resource_type == "model" && self.dal().is_some_and(|dal| dal.expose)
    }

    fn table(&self) -> String {
        let relation = self
            .alias
            .as_deref()
            .filter(|alias| !alias.is_empty())
            .unwrap_or(&self.name);
        match self.schema.as_deref().filter(|schema| !schema.is_empty()) {
            Some(schema) => format!("{}.{}", schema, relation),
            None => relation.to_string(),
        }
    }
}

impl Catalog {
    fn column<'a>(
        &'a self,
        unique_id: &str,
        column: &str,
    ) -> Result<&'a CatalogColumn, CatalogError> {
        let node = self
            .nodes
            .get(unique_id)
            .ok_or_else(|| CatalogError::MissingCatalogNode {
                unique_id: unique_id.to_string(),
            })?;
        node.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, col)| col)
            .ok_or_else(|| CatalogError::MissingColumnType {
                model: unique_id.to_string(),
                column: column.to_string(),
            })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let contents = fs::read_to_string(path).map_err(|e| CatalogError::ConfigReadError {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| CatalogError::ConfigParseError {
        error: format!("{}: {}", path.display(), e),
    })
}

/// Loads a dbt project rooted at `project_dir`. `dialect` overrides the
/// adapter recorded in the manifest.
pub fn load_dbt_project(
    project_dir: &Path,
    dialect: Option<TypeDialect>,
) -> Result<Schema, CatalogError> {
    let target = project_dir.join("target");
    let manifest: Manifest = read_json(&target.join("manifest.json"))?;
    let catalog: Catalog = read_json(&target.join("catalog.json"))?;
    build_schema(&manifest, &catalog, dialect)
}

pub fn build_schema(
    manifest: &Manifest,
    catalog: &Catalog,
    dialect: Option<TypeDialect>,
) -> Result<Schema, CatalogError> {
    let dialect = match dialect {
        Some(dialect) => dialect,
        None => manifest
            .metadata
            .adapter_type
            .as_deref()
            .map(str::parse::<TypeDialect>)
            .transpose()
            .map_err(CatalogError::invalid)?
            .unwrap_or_default(),
    };

    let exposed: Vec<&ManifestNode> = manifest.nodes.values().filter(|n| n.is_exposed()).collect();
    if exposed.is_empty() {
        return Err(CatalogError::invalid(
            "no dbt model sets config.meta.dal.expose",
        ));
    }

    let mut schema = Schema::new();
    for node in &exposed {
        let primary_key = node.dal().map(|d| d.primary_key.as_str()).unwrap_or_default();
        let entity = schema.add_entity(&node.name, &node.description, primary_key)?;
        entity.with_table(node.table());

        let mut columns = Vec::with_capacity(node.columns.len());
        for column in node.columns.values() {
            let typed = catalog.column(&node.unique_id, &column.name)?;
            columns.push((typed.index, column, map_type(dialect, &typed.data_type)));
        }
        columns.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
        for (_, column, scalar) in columns {
            entity.add_column(&column.name, &column.description, scalar)?;
        }
    }

    for node in &exposed {
        let Some(dal) = node.dal() else { continue };
        for fk in &dal.foreign_keys {
            if let Some(left_on) = &fk.left_on {
                if left_on != &dal.primary_key {
                    log::warn!(
                        "dbt model {}: foreign key to {} joins on `{}`, only the primary key `{}` is used",
                        node.name,
                        fk.model,
                        left_on,
                        dal.primary_key
                    );
                }
            }
            schema.add_foreign_key(&node.name, &fk.model, &fk.right_on)?;
        }
    }

    schema.validate()?;
    log::info!(
        "Loaded {} dbt models ({} relations, {} types)",
        schema.len(),
        schema.relation_count(),
        dialect
    );
    Ok(schema)
}
