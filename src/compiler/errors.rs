use thiserror::Error;

/// Problems turning a field selection into SQL. Reported on the offending
/// root field only; sibling fields still resolve.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("`{column}` is not a column of `{entity}`")]
    UnknownColumn { entity: String, column: String },
    #[error("invalid `{argument}` argument: {reason}")]
    InvalidArgument { argument: String, reason: String },
    #[error("unsupported literal {value} for column `{column}`")]
    UnsupportedLiteral { column: String, value: String },
    #[error("operator `{op}` cannot compare `{column}` with null; use eq or neq")]
    NullComparison { column: String, op: String },
}

impl CompileError {
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}
