//! # Query Compiler
//!
//! Turns one root-field selection into a single SELECT statement, and a set of
//! relation keys into the batched `IN` lookup the loader issues.
//!
//! Root statements always list the primary key first, followed by the
//! requested leaf columns in request order (the primary key is never repeated):
//!
//! ```text
//! { foo(filter: {a: {eq: "z"}}, sort: {a: asc}, limit: 10, offset: 20) { a b } }
//!   => SELECT a, b FROM foo WHERE (a = 'z') ORDER BY a ASC LIMIT 10 OFFSET 20
//! ```
//!
//! Relation statements select every column of the target:
//!
//! ```text
//!   => SELECT * FROM foo WHERE (a IN (1, 2))
//! ```

pub mod errors;
pub mod filter;
pub mod literal;
pub mod sort;
pub mod statement;

use std::collections::HashSet;

use serde_json::{Map, Value};

pub use errors::CompileError;
pub use filter::FilterOp;
pub use literal::Literal;
pub use statement::{
    FilterItems, FromTableItem, LimitItem, OrderByItem, OrderByItems, OrderByOrder, Predicate,
    SelectItems, SelectStatement, SkipItem,
};

use crate::model::Entity;
use crate::warehouse::IdentifierCase;

pub const DEFAULT_LIMIT: i64 = 500;

pub trait ToSql {
    fn to_sql(&self) -> String;
}

/// Everything a root field asks for, after argument parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRequest {
    pub fields: Vec<String>,
    pub filter: Option<Value>,
    pub sort: Option<Value>,
    pub limit: i64,
    pub offset: i64,
}

impl SelectionRequest {
    pub fn new(fields: Vec<String>) -> Self {
        SelectionRequest {
            fields,
            filter: None,
            sort: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Reads `limit`, `offset`, `filter` and `sort` from field arguments.
    /// Absent or null `limit` falls back to [`DEFAULT_LIMIT`].
    pub fn from_arguments(
        fields: Vec<String>,
        arguments: &Map<String, Value>,
    ) -> Result<Self, CompileError> {
        let limit = integer_argument(arguments, "limit")?.unwrap_or(DEFAULT_LIMIT);
        let offset = integer_argument(arguments, "offset")?.unwrap_or(0);
        Ok(SelectionRequest {
            fields,
            filter: arguments.get("filter").cloned(),
            sort: arguments.get("sort").cloned(),
            limit,
            offset,
        })
    }
}

fn integer_argument(
    arguments: &Map<String, Value>,
    name: &str,
) -> Result<Option<i64>, CompileError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) if v >= 0 => Ok(Some(v)),
            Some(v) => Err(CompileError::invalid_argument(
                name,
                format!("must not be negative, got {}", v),
            )),
            None => Err(CompileError::invalid_argument(
                name,
                format!("expected an integer, got {}", n),
            )),
        },
        Some(other) => Err(CompileError::invalid_argument(
            name,
            format!("expected an integer, got {}", other),
        )),
    }
}

/// Primary key first, then requested columns in order, without repeats.
pub fn select_columns(entity: &Entity, requested: &[String]) -> Result<Vec<String>, CompileError> {
    let mut columns = Vec::with_capacity(requested.len() + 1);
    columns.push(entity.primary_key.clone());
    for field in requested {
        if entity.column(field).is_none() {
            return Err(CompileError::UnknownColumn {
                entity: entity.name.clone(),
                column: field.clone(),
            });
        }
        if !columns.contains(field) {
            columns.push(field.clone());
        }
    }
    Ok(columns)
}

pub fn compile_select(
    entity: &Entity,
    request: &SelectionRequest,
    case: IdentifierCase,
) -> Result<SelectStatement, CompileError> {
    if request.limit < 0 {
        return Err(CompileError::invalid_argument("limit", "must not be negative"));
    }
    if request.offset < 0 {
        return Err(CompileError::invalid_argument("offset", "must not be negative"));
    }

    let columns = select_columns(entity, &request.fields)?
        .iter()
        .map(|c| case.normalize(c))
        .collect();
    let predicates = filter::parse_filter(entity, request.filter.as_ref(), case)?;
    let order_by = sort::parse_sort(entity, request.sort.as_ref(), case)?;

    Ok(SelectStatement {
        select: SelectItems::Columns(columns),
        from: FromTableItem(case.normalize(entity.table())),
        filters: FilterItems(predicates),
        order_by: OrderByItems(order_by),
        limit: LimitItem(Some(request.limit)),
        skip: SkipItem((request.offset > 0).then_some(request.offset)),
    })
}

/// `SELECT * FROM target WHERE (join_column IN (...))` over the distinct keys,
/// in first-seen order.
pub fn compile_relation(
    target: &Entity,
    join_column: &str,
    keys: &[Value],
    case: IdentifierCase,
) -> Result<SelectStatement, CompileError> {
    if target.column(join_column).is_none() {
        return Err(CompileError::UnknownColumn {
            entity: target.name.clone(),
            column: join_column.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(keys.len());
    for key in keys {
        if key.is_null() || !seen.insert(key.to_string()) {
            continue;
        }
        values.push(Literal::from_json(join_column, key)?);
    }
    if values.is_empty() {
        return Err(CompileError::invalid_argument(
            join_column,
            "relation lookup needs at least one key",
        ));
    }

    Ok(SelectStatement {
        select: SelectItems::Star,
        from: FromTableItem(case.normalize(target.table())),
        filters: FilterItems(vec![Predicate::In {
            column: case.normalize(join_column),
            values,
        }]),
        order_by: OrderByItems::default(),
        limit: LimitItem(None),
        skip: SkipItem(None),
    })
}
