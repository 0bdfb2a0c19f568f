use async_graphql::ErrorExtensions;
use thiserror::Error;

use crate::compiler::CompileError;
use crate::loader::LoadError;

/// Fatal problems found while generating the GraphQL schema.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaBuildError {
    #[error("type name `{name}` generated for {second} is already used by {first}")]
    DuplicateTypeName {
        name: String,
        first: String,
        second: String,
    },
    #[error("field `{field}` on type `{type_name}` is defined twice ({reason})")]
    DuplicateField {
        type_name: String,
        field: String,
        reason: String,
    },
    #[error("`{name}` is not a valid GraphQL name ({usage})")]
    InvalidName { name: String, usage: String },
    #[error("schema has no entities")]
    Empty,
    #[error("GraphQL schema rejected: {0}")]
    Finish(String),
}

/// Errors surfaced on a single field of a response.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{0}")]
    Internal(String),
}

impl ResolveError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::Compile(_) => "COMPILE_ERROR",
            ResolveError::Load(LoadError::Compile(_)) => "COMPILE_ERROR",
            ResolveError::Load(LoadError::Execution(_)) => "EXECUTION_ERROR",
            ResolveError::Load(LoadError::Cancelled) => "CANCELLED",
            ResolveError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ErrorExtensions for ResolveError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}
