//! SQL literal rendering for argument and key values.

use serde_json::{Number, Value};

use super::errors::CompileError;
use super::ToSql;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(Number),
    String(String),
}

impl Literal {
    /// Only scalars are accepted; lists and objects have no SQL literal form.
    pub fn from_json(column: &str, value: &Value) -> Result<Self, CompileError> {
        match value {
            Value::Null => Ok(Literal::Null),
            Value::Bool(b) => Ok(Literal::Boolean(*b)),
            Value::Number(n) => Ok(Literal::Number(n.clone())),
            Value::String(s) => Ok(Literal::String(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(CompileError::UnsupportedLiteral {
                column: column.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl ToSql for Literal {
    fn to_sql(&self) -> String {
        match self {
            Literal::Null => "NULL".to_string(),
            Literal::Boolean(true) => "TRUE".to_string(),
            Literal::Boolean(false) => "FALSE".to_string(),
            Literal::Number(n) => n.to_string(),
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}
