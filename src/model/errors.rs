//! Errors raised while assembling the entity model.
//!
//! All of these are build-time failures: the model is validated before any
//! GraphQL type is generated, so none of them can surface while serving.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("cannot create foreign key: `{entity}` is not a valid model")]
    UnknownEntity { entity: String },
    #[error("model `{entity}` is already defined")]
    DuplicateEntity { entity: String },
    #[error("column `{column}` is already defined on model `{entity}`")]
    DuplicateColumn { entity: String, column: String },
    #[error("column `{column}` referenced by {usage} does not exist on model `{entity}`")]
    UnknownColumn {
        entity: String,
        column: String,
        usage: String,
    },
    #[error("model `{entity}` has no columns")]
    EmptyEntity { entity: String },
    #[error("unknown scalar type `{name}`")]
    UnknownScalar { name: String },
}

impl ModelError {
    pub fn unknown_column(
        entity: impl Into<String>,
        column: impl Into<String>,
        usage: impl Into<String>,
    ) -> Self {
        ModelError::UnknownColumn {
            entity: entity.into(),
            column: column.into(),
            usage: usage.into(),
        }
    }
}
