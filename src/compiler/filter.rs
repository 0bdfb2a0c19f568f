//! Parsing of the `filter` argument.
//!
//! The argument has the shape `{column: {op: value, ...}, ...}`. Every
//! operator becomes one predicate; predicates are conjoined in argument order,
//! so `{a: {gt: 1, lt: 10}}` means `a > 1 AND a < 10`.

use serde_json::Value;

use super::errors::CompileError;
use super::literal::Literal;
use super::statement::Predicate;
use super::ToSql;
use crate::model::Entity;
use crate::warehouse::IdentifierCase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl FilterOp {
    pub const ALL: [FilterOp; 6] = [
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::Lt,
        FilterOp::Gt,
        FilterOp::Lte,
        FilterOp::Gte,
    ];

    /// Input field name in the GraphQL filter type.
    pub fn name(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Lt => "lt",
            FilterOp::Gt => "gt",
            FilterOp::Lte => "lte",
            FilterOp::Gte => "gte",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FilterOp::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl ToSql for FilterOp {
    fn to_sql(&self) -> String {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::Lt => "<",
            FilterOp::Gt => ">",
            FilterOp::Lte => "<=",
            FilterOp::Gte => ">=",
        }
        .to_string()
    }
}

pub fn parse_filter(
    entity: &Entity,
    filter: Option<&Value>,
    case: IdentifierCase,
) -> Result<Vec<Predicate>, CompileError> {
    let columns = match filter {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(columns)) => columns,
        Some(other) => {
            return Err(CompileError::invalid_argument(
                "filter",
                format!("expected an object, got {}", other),
            ))
        }
    };

    let mut predicates = Vec::new();
    for (column, ops) in columns {
        if entity.column(column).is_none() {
            return Err(CompileError::UnknownColumn {
                entity: entity.name.clone(),
                column: column.clone(),
            });
        }
        let ops = match ops {
            Value::Null => continue,
            Value::Object(ops) => ops,
            other => {
                return Err(CompileError::invalid_argument(
                    "filter",
                    format!("expected operators for `{}`, got {}", column, other),
                ))
            }
        };
        let sql_column = case.normalize(column);
        for (op_name, value) in ops {
            let op = FilterOp::from_name(op_name).ok_or_else(|| {
                CompileError::invalid_argument(
                    "filter",
                    format!("unknown operator `{}` on `{}`", op_name, column),
                )
            })?;
            let predicate = match (op, Literal::from_json(column, value)?) {
                (FilterOp::Eq, Literal::Null) => Predicate::IsNull {
                    column: sql_column.clone(),
                    negated: false,
                },
                (FilterOp::Neq, Literal::Null) => Predicate::IsNull {
                    column: sql_column.clone(),
                    negated: true,
                },
                (op, Literal::Null) => {
                    return Err(CompileError::NullComparison {
                        column: column.clone(),
                        op: op.name().to_string(),
                    })
                }
                (op, literal) => Predicate::Compare {
                    column: sql_column.clone(),
                    op,
                    value: literal,
                },
            };
            predicates.push(predicate);
        }
    }
    Ok(predicates)
}
