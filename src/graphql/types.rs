//! Scalar mapping between the entity model, GraphQL and warehouse JSON.

use async_graphql::dynamic::{Scalar as GqlScalar, TypeRef};
use async_graphql::{Name, Number, Value as GqlValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::model::Scalar;

pub const DATETIME_SCALAR: &str = "DateTime";

pub fn type_name(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Identifier => TypeRef::ID,
        Scalar::Integer => TypeRef::INT,
        Scalar::Float => TypeRef::FLOAT,
        Scalar::Boolean => TypeRef::BOOLEAN,
        Scalar::Text => TypeRef::STRING,
        Scalar::DateTime => DATETIME_SCALAR,
    }
}

pub fn datetime_scalar() -> GqlScalar {
    GqlScalar::new(DATETIME_SCALAR).description("A date-time string in RFC 3339 format")
}

/// Converts a warehouse value into the column's GraphQL representation.
/// Values that cannot be converted are passed through unchanged; null maps
/// to `None`.
pub fn to_graphql(scalar: Scalar, value: &Value) -> Option<GqlValue> {
    if value.is_null() {
        return None;
    }
    let coerced = match (scalar, value) {
        (Scalar::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(GqlValue::from),
        (Scalar::Integer, Value::Number(n)) if n.as_i64().is_none() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| GqlValue::from(f as i64)),
        (Scalar::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(GqlValue::Number),
        (Scalar::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(GqlValue::Boolean(false)),
            Some(1) => Some(GqlValue::Boolean(true)),
            _ => None,
        },
        (Scalar::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(GqlValue::Boolean(true)),
            "false" | "0" => Some(GqlValue::Boolean(false)),
            _ => None,
        },
        (Scalar::Identifier, Value::Number(n)) => Some(GqlValue::String(n.to_string())),
        (Scalar::Text, Value::Number(n)) => Some(GqlValue::String(n.to_string())),
        (Scalar::Text, Value::Bool(b)) => Some(GqlValue::String(b.to_string())),
        (Scalar::DateTime, Value::String(s)) => normalize_datetime(s).map(GqlValue::String),
        (Scalar::DateTime, Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| GqlValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        _ => None,
    };
    coerced.or_else(|| GqlValue::from_json(value.clone()).ok())
}

/// Accepts RFC 3339 as is and reads ClickHouse style `YYYY-MM-DD hh:mm:ss`
/// as UTC.
fn normalize_datetime(raw: &str) -> Option<String> {
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return Some(raw.to_string());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(
            naive
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
    }
    if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return Some(raw.to_string());
    }
    None
}

/// Argument values as JSON, with enum values turned into their names.
pub fn arguments_to_json<'a, I>(arguments: I) -> serde_json::Map<String, Value>
where
    I: IntoIterator<Item = (&'a Name, &'a GqlValue)>,
{
    arguments
        .into_iter()
        .map(|(name, value)| {
            let json = value.clone().into_json().unwrap_or(Value::Null);
            (name.to_string(), json)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_type_names() {
        assert_eq!(type_name(Scalar::Identifier), "ID");
        assert_eq!(type_name(Scalar::Integer), "Int");
        assert_eq!(type_name(Scalar::Float), "Float");
        assert_eq!(type_name(Scalar::Boolean), "Boolean");
        assert_eq!(type_name(Scalar::Text), "String");
        assert_eq!(type_name(Scalar::DateTime), "DateTime");
    }

    #[test]
    fn test_quoted_integers_become_numbers() {
        assert_eq!(
            to_graphql(Scalar::Integer, &json!("18446744")),
            Some(GqlValue::from(18446744i64))
        );
        assert_eq!(to_graphql(Scalar::Integer, &json!(7)), Some(GqlValue::from(7)));
    }

    #[test]
    fn test_booleans_from_numbers() {
        assert_eq!(
            to_graphql(Scalar::Boolean, &json!(1)),
            Some(GqlValue::Boolean(true))
        );
        assert_eq!(
            to_graphql(Scalar::Boolean, &json!("false")),
            Some(GqlValue::Boolean(false))
        );
    }

    #[test]
    fn test_datetime_normalized_to_rfc3339() {
        assert_eq!(
            to_graphql(Scalar::DateTime, &json!("2024-03-01 12:30:00")),
            Some(GqlValue::String("2024-03-01T12:30:00Z".to_string()))
        );
        assert_eq!(
            to_graphql(Scalar::DateTime, &json!("2024-03-01T12:30:00+02:00")),
            Some(GqlValue::String("2024-03-01T12:30:00+02:00".to_string()))
        );
    }

    #[test]
    fn test_null_and_uncoercible_values() {
        assert_eq!(to_graphql(Scalar::Integer, &Value::Null), None);
        assert_eq!(
            to_graphql(Scalar::Integer, &json!("n/a")),
            Some(GqlValue::String("n/a".to_string()))
        );
        assert_eq!(
            to_graphql(Scalar::Identifier, &json!(42)),
            Some(GqlValue::String("42".to_string()))
        );
    }
}
