use std::sync::Arc;

use thiserror::Error;

use crate::compiler::CompileError;
use crate::warehouse::WarehouseError;

/// Outcome of a failed relation batch. Cloned to every parent waiting on it.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("{0}")]
    Execution(Arc<WarehouseError>),
    #[error("{0}")]
    Compile(CompileError),
    #[error("request was cancelled")]
    Cancelled,
}

impl From<WarehouseError> for LoadError {
    fn from(error: WarehouseError) -> Self {
        LoadError::Execution(Arc::new(error))
    }
}

impl From<CompileError> for LoadError {
    fn from(error: CompileError) -> Self {
        LoadError::Compile(error)
    }
}
