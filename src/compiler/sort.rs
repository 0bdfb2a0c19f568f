use serde_json::Value;

use super::errors::CompileError;
use super::statement::{OrderByItem, OrderByOrder};
use crate::model::Entity;
use crate::warehouse::IdentifierCase;

impl OrderByOrder {
    /// `asc` sorts ascending; every other direction name sorts descending.
    pub fn from_direction(direction: &str) -> Self {
        if direction == "asc" {
            OrderByOrder::Asc
        } else {
            OrderByOrder::Desc
        }
    }
}

/// Parses `sort: {column: direction, ...}` into ORDER BY items, argument order.
pub fn parse_sort(
    entity: &Entity,
    sort: Option<&Value>,
    case: IdentifierCase,
) -> Result<Vec<OrderByItem>, CompileError> {
    let columns = match sort {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(columns)) => columns,
        Some(other) => {
            return Err(CompileError::invalid_argument(
                "sort",
                format!("expected an object, got {}", other),
            ))
        }
    };

    let mut items = Vec::with_capacity(columns.len());
    for (column, direction) in columns {
        if entity.column(column).is_none() {
            return Err(CompileError::UnknownColumn {
                entity: entity.name.clone(),
                column: column.clone(),
            });
        }
        let order = match direction {
            Value::Null => continue,
            Value::String(direction) => OrderByOrder::from_direction(direction),
            other => {
                return Err(CompileError::invalid_argument(
                    "sort",
                    format!("expected a direction for `{}`, got {}", column, other),
                ))
            }
        };
        items.push(OrderByItem {
            column: case.normalize(column),
            order,
        });
    }
    Ok(items)
}
