//! Backend type name to [`Scalar`] tables.
//!
//! Each dialect is an ordered list of patterns, checked id, int, float,
//! boolean, string, datetime. The first match wins; a type no pattern matches
//! is exposed as [`Scalar::Text`].

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::Scalar;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TypeDialect {
    #[default]
    ClickHouse,
    Snowflake,
}

impl FromStr for TypeDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clickhouse" => Ok(TypeDialect::ClickHouse),
            "snowflake" => Ok(TypeDialect::Snowflake),
            other => Err(format!("unsupported type dialect '{}'", other)),
        }
    }
}

impl fmt::Display for TypeDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDialect::ClickHouse => f.write_str("clickhouse"),
            TypeDialect::Snowflake => f.write_str("snowflake"),
        }
    }
}

struct TypeTable(Vec<(Regex, Scalar)>);

impl TypeTable {
    fn new(patterns: &[(&str, Scalar)]) -> Self {
        TypeTable(
            patterns
                .iter()
                .map(|(pattern, scalar)| {
                    (
                        Regex::new(pattern).expect("type pattern should compile"),
                        *scalar,
                    )
                })
                .collect(),
        )
    }

    fn matches(&self, raw: &str) -> Scalar {
        self.0
            .iter()
            .find(|(pattern, _)| pattern.is_match(raw))
            .map(|(_, scalar)| *scalar)
            .unwrap_or(Scalar::Text)
    }
}

lazy_static! {
    static ref CLICKHOUSE_TYPES: TypeTable = TypeTable::new(&[
        (r"^UUID$", Scalar::Identifier),
        (r"^U?Int(8|16|32|64|128|256)$", Scalar::Integer),
        (r"^(Float(32|64)|BFloat16|Decimal(32|64|128|256)?\(.*\))$", Scalar::Float),
        (r"^Bool(ean)?$", Scalar::Boolean),
        (r"^(String|FixedString\(\d+\)|Enum(8|16)?\(.*\)|IPv[46])$", Scalar::Text),
        (r"^(Date|Date32|DateTime(64)?(\(.*\))?)$", Scalar::DateTime),
    ]);
    static ref SNOWFLAKE_TYPES: TypeTable = TypeTable::new(&[
        (r"(?i)(FIXED|INT|NUMBER|NUMERIC|DECIMAL)", Scalar::Integer),
        (r"(?i)(REAL|FLOAT|DOUBLE)", Scalar::Float),
        (r"(?i)(BOOLEAN)", Scalar::Boolean),
        (r"(?i)(CHAR|STRING|TEXT)", Scalar::Text),
        (r"(?i)(TIME|DATE)", Scalar::DateTime),
    ]);
}

/// Strips `Nullable(..)` and `LowCardinality(..)` wrappers.
fn unwrap_clickhouse_type(raw: &str) -> &str {
    let mut inner = raw.trim();
    loop {
        let stripped = ["Nullable(", "LowCardinality("]
            .iter()
            .find_map(|wrapper| inner.strip_prefix(wrapper))
            .and_then(|rest| rest.strip_suffix(')'));
        match stripped {
            Some(rest) => inner = rest.trim(),
            None => return inner,
        }
    }
}

pub fn map_type(dialect: TypeDialect, raw: &str) -> Scalar {
    match dialect {
        TypeDialect::ClickHouse => CLICKHOUSE_TYPES.matches(unwrap_clickhouse_type(raw)),
        TypeDialect::Snowflake => SNOWFLAKE_TYPES.matches(raw),
    }
}
