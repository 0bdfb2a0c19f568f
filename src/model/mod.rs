//! # Entity Model
//!
//! The static description of everything the GraphQL surface exposes: entities
//! (tables), their columns and the foreign keys between them.
//!
//! The model is append-only. A catalog loader adds entities first, then columns
//! and foreign keys, calls [`Schema::validate`], and freezes the result into an
//! `Arc<Schema>` that is shared read-only by the schema builder and every
//! request.

pub mod errors;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use errors::ModelError;

/// Closed set of column scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    #[serde(alias = "id")]
    Identifier,
    #[serde(alias = "int")]
    Integer,
    Float,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "string")]
    Text,
    DateTime,
}

impl Scalar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scalar::Identifier => "id",
            Scalar::Integer => "int",
            Scalar::Float => "float",
            Scalar::Boolean => "boolean",
            Scalar::Text => "string",
            Scalar::DateTime => "datetime",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scalar {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" | "identifier" => Ok(Scalar::Identifier),
            "int" | "integer" => Ok(Scalar::Integer),
            "float" => Ok(Scalar::Float),
            "bool" | "boolean" => Ok(Scalar::Boolean),
            "string" | "text" => Ok(Scalar::Text),
            "datetime" => Ok(Scalar::DateTime),
            _ => Err(ModelError::UnknownScalar {
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub description: String,
    pub scalar: Scalar,
}

/// Directed one-to-many relation: every row of the owning entity relates to the
/// rows of `target` whose `join_column` equals the owner's primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub target: String,
    pub join_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub description: String,
    pub primary_key: String,
    table: Option<String>,
    columns: Vec<Column>,
    foreign_keys: Vec<ForeignKey>,
}

impl Entity {
    fn new(name: String, description: String, primary_key: String) -> Self {
        Entity {
            name,
            description,
            primary_key,
            table: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        scalar: Scalar,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(ModelError::DuplicateColumn {
                entity: self.name.clone(),
                column: name,
            });
        }
        self.columns.push(Column {
            name,
            description: description.into(),
            scalar,
        });
        Ok(())
    }

    /// Overrides the backend table, e.g. `analytics.orders`.
    pub fn with_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    /// Backend table name; defaults to the entity name.
    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }
}

/// Insertion-ordered set of entities, unique by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Result<&mut Entity, ModelError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(ModelError::DuplicateEntity { entity: name });
        }
        let position = self.entities.len();
        self.index.insert(name.clone(), position);
        self.entities
            .push(Entity::new(name, description.into(), primary_key.into()));
        Ok(&mut self.entities[position])
    }

    /// Declares a relation from `owner` to `target`. The target must already
    /// be part of the schema.
    pub fn add_foreign_key(
        &mut self,
        owner: &str,
        target: &str,
        join_column: impl Into<String>,
    ) -> Result<(), ModelError> {
        if !self.index.contains_key(target) {
            return Err(ModelError::UnknownEntity {
                entity: target.to_string(),
            });
        }
        let entity = self
            .entity_mut(owner)
            .ok_or_else(|| ModelError::UnknownEntity {
                entity: owner.to_string(),
            })?;
        entity.foreign_keys.push(ForeignKey {
            target: target.to_string(),
            join_column: join_column.into(),
        });
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entities[i]),
            None => None,
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn relation_count(&self) -> usize {
        self.entities.iter().map(|e| e.foreign_keys.len()).sum()
    }

    /// Cross-checks primary keys and join columns against declared columns.
    pub fn validate(&self) -> Result<(), ModelError> {
        for entity in &self.entities {
            if entity.columns.is_empty() {
                return Err(ModelError::EmptyEntity {
                    entity: entity.name.clone(),
                });
            }
            if entity.column(&entity.primary_key).is_none() {
                return Err(ModelError::unknown_column(
                    &entity.name,
                    &entity.primary_key,
                    "primary key",
                ));
            }
            for fk in &entity.foreign_keys {
                // add_foreign_key guarantees the target exists
                let Some(target) = self.entity(&fk.target) else {
                    continue;
                };
                if target.column(&fk.join_column).is_none() {
                    return Err(ModelError::unknown_column(
                        &target.name,
                        &fk.join_column,
                        format!("foreign key from `{}`", entity.name),
                    ));
                }
            }
        }
        Ok(())
    }
}
