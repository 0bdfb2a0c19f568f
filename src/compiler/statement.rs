//! Clause-level representation of one SELECT statement.
//!
//! Each clause renders itself; an empty clause renders as an empty string and
//! is dropped when the statement is assembled.

use super::filter::FilterOp;
use super::literal::Literal;
use super::ToSql;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub select: SelectItems,
    pub from: FromTableItem,
    pub filters: FilterItems,
    pub order_by: OrderByItems,
    pub limit: LimitItem,
    pub skip: SkipItem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItems {
    Star,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromTableItem(pub String);

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: FilterOp,
        value: Literal,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Literal>,
    },
}

/// Conjunction of predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterItems(pub Vec<Predicate>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column: String,
    pub order: OrderByOrder,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderByItems(pub Vec<OrderByItem>);

#[derive(Debug, Clone, PartialEq)]
pub struct LimitItem(pub Option<i64>);

/// OFFSET; only rendered for values above zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipItem(pub Option<i64>);

impl ToSql for SelectItems {
    fn to_sql(&self) -> String {
        match self {
            SelectItems::Star => "SELECT *".to_string(),
            SelectItems::Columns(columns) => format!("SELECT {}", columns.join(", ")),
        }
    }
}

impl ToSql for FromTableItem {
    fn to_sql(&self) -> String {
        format!("FROM {}", self.0)
    }
}

impl ToSql for Predicate {
    fn to_sql(&self) -> String {
        match self {
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", column, op.to_sql(), value.to_sql())
            }
            Predicate::IsNull {
                column,
                negated: false,
            } => format!("{} IS NULL", column),
            Predicate::IsNull {
                column,
                negated: true,
            } => format!("{} IS NOT NULL", column),
            Predicate::In { column, values } => {
                let values: Vec<String> = values.iter().map(|v| v.to_sql()).collect();
                format!("{} IN ({})", column, values.join(", "))
            }
        }
    }
}

impl ToSql for FilterItems {
    fn to_sql(&self) -> String {
        match self.0.as_slice() {
            [] => String::new(),
            [single] => format!("WHERE ({})", single.to_sql()),
            many => {
                let terms: Vec<String> = many
                    .iter()
                    .map(|p| format!("({})", p.to_sql()))
                    .collect();
                format!("WHERE ({})", terms.join(" AND "))
            }
        }
    }
}

impl ToSql for OrderByOrder {
    fn to_sql(&self) -> String {
        match self {
            OrderByOrder::Asc => "ASC".to_string(),
            OrderByOrder::Desc => "DESC".to_string(),
        }
    }
}

impl ToSql for OrderByItems {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let items: Vec<String> = self
            .0
            .iter()
            .map(|item| format!("{} {}", item.column, item.order.to_sql()))
            .collect();
        format!("ORDER BY {}", items.join(", "))
    }
}

impl ToSql for LimitItem {
    fn to_sql(&self) -> String {
        match self.0 {
            Some(limit) => format!("LIMIT {}", limit),
            None => String::new(),
        }
    }
}

impl ToSql for SkipItem {
    fn to_sql(&self) -> String {
        match self.0 {
            Some(skip) if skip > 0 => format!("OFFSET {}", skip),
            _ => String::new(),
        }
    }
}

impl ToSql for SelectStatement {
    fn to_sql(&self) -> String {
        let clauses = [
            self.select.to_sql(),
            self.from.to_sql(),
            self.filters.to_sql(),
            self.order_by.to_sql(),
            self.limit.to_sql(),
            self.skip.to_sql(),
        ];
        clauses
            .into_iter()
            .filter(|clause| !clause.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
