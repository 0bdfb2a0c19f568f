//! Backend type strings to entity scalars.

#[cfg(test)]
mod type_mapping_tests {
    use test_case::test_case;

    use dalgraph::catalog::{map_type, TypeDialect};
    use dalgraph::model::Scalar;

    #[test_case("UInt64", Scalar::Integer)]
    #[test_case("Nullable(Int32)", Scalar::Integer)]
    #[test_case("LowCardinality(String)", Scalar::Text)]
    #[test_case("Float64", Scalar::Float)]
    #[test_case("Decimal(18, 2)", Scalar::Float)]
    #[test_case("Bool", Scalar::Boolean)]
    #[test_case("DateTime64(3)", Scalar::DateTime)]
    #[test_case("UUID", Scalar::Identifier)]
    #[test_case("Map(String, UInt8)", Scalar::Text ; "unknown falls back to text")]
    fn test_clickhouse_types(raw: &str, expected: Scalar) {
        assert_eq!(map_type(TypeDialect::ClickHouse, raw), expected);
    }

    #[test_case("NUMBER(38,0)", Scalar::Integer)]
    #[test_case("FLOAT", Scalar::Float)]
    #[test_case("VARCHAR(16777216)", Scalar::Text)]
    #[test_case("BOOLEAN", Scalar::Boolean)]
    #[test_case("TIMESTAMP_NTZ", Scalar::DateTime)]
    #[test_case("VARIANT", Scalar::Text ; "unknown falls back to text")]
    fn test_snowflake_types(raw: &str, expected: Scalar) {
        assert_eq!(map_type(TypeDialect::Snowflake, raw), expected);
    }
}
