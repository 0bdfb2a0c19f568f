//! SQL generated for root fields and relation lookups.

#[cfg(test)]
mod sql_generation_tests {
    use serde_json::{json, Value};
    use test_case::test_case;

    use dalgraph::compiler::{
        compile_relation, compile_select, CompileError, FilterOp, SelectionRequest, ToSql,
    };
    use dalgraph::model::{Entity, Scalar, Schema};
    use dalgraph::warehouse::IdentifierCase;

    fn orders() -> Entity {
        let mut schema = Schema::new();
        let entity = schema.add_entity("orders", "", "id").unwrap();
        entity.with_table("analytics.orders");
        entity.add_column("id", "", Scalar::Identifier).unwrap();
        entity.add_column("status", "", Scalar::Text).unwrap();
        entity.add_column("total", "", Scalar::Float).unwrap();
        entity.add_column("customer_id", "", Scalar::Integer).unwrap();
        schema.entity("orders").unwrap().clone()
    }

    fn sql_for(arguments: Value, fields: &[&str]) -> Result<String, CompileError> {
        let arguments = arguments.as_object().cloned().unwrap_or_default();
        let fields = fields.iter().map(|f| f.to_string()).collect();
        let request = SelectionRequest::from_arguments(fields, &arguments)?;
        Ok(compile_select(&orders(), &request, IdentifierCase::Preserve)?.to_sql())
    }

    #[test_case(json!({}), &["status"], "SELECT id, status FROM analytics.orders LIMIT 500" ; "defaults")]
    #[test_case(json!({"limit": 5}), &["id"], "SELECT id FROM analytics.orders LIMIT 5" ; "primary key not repeated")]
    #[test_case(json!({"offset": 0}), &["total"], "SELECT id, total FROM analytics.orders LIMIT 500" ; "zero offset omitted")]
    #[test_case(json!({"limit": 10, "offset": 30}), &["total", "status"], "SELECT id, total, status FROM analytics.orders LIMIT 10 OFFSET 30" ; "request order kept")]
    #[test_case(json!({"sort": {"total": "desc", "status": "asc"}}), &["total"], "SELECT id, total FROM analytics.orders ORDER BY total DESC, status ASC LIMIT 500" ; "sort in argument order")]
    #[test_case(json!({"filter": {"status": {"eq": "o'k"}}}), &["status"], "SELECT id, status FROM analytics.orders WHERE (status = 'o''k') LIMIT 500" ; "quotes escaped")]
    #[test_case(json!({"filter": {"total": {"gte": 10, "lt": 20.5}}}), &["total"], "SELECT id, total FROM analytics.orders WHERE ((total >= 10) AND (total < 20.5)) LIMIT 500" ; "operators conjoin")]
    #[test_case(json!({"filter": {"status": {"eq": null}}}), &["status"], "SELECT id, status FROM analytics.orders WHERE (status IS NULL) LIMIT 500" ; "eq null")]
    #[test_case(json!({"filter": {"status": {"neq": null}}}), &["status"], "SELECT id, status FROM analytics.orders WHERE (status IS NOT NULL) LIMIT 500" ; "neq null")]
    fn test_root_statement(arguments: Value, fields: &[&str], expected: &str) {
        assert_eq!(sql_for(arguments, fields).unwrap(), expected);
    }

    #[test_case(FilterOp::Eq, "=")]
    #[test_case(FilterOp::Neq, "!=")]
    #[test_case(FilterOp::Lt, "<")]
    #[test_case(FilterOp::Gt, ">")]
    #[test_case(FilterOp::Lte, "<=")]
    #[test_case(FilterOp::Gte, ">=")]
    fn test_filter_operator(op: FilterOp, symbol: &str) {
        let sql = sql_for(json!({"filter": {"customer_id": {op.name(): 7}}}), &[]).unwrap();
        assert_eq!(
            sql,
            format!("SELECT id FROM analytics.orders WHERE (customer_id {} 7) LIMIT 500", symbol)
        );
    }

    #[test]
    fn test_rejected_arguments() {
        assert!(matches!(
            sql_for(json!({"limit": -1}), &[]),
            Err(CompileError::InvalidArgument { .. })
        ));
        assert!(matches!(
            sql_for(json!({"filter": {"total": {"gt": null}}}), &[]),
            Err(CompileError::NullComparison { .. })
        ));
        assert!(matches!(
            sql_for(json!({}), &["missing"]),
            Err(CompileError::UnknownColumn { .. })
        ));
        assert!(matches!(
            sql_for(json!({"filter": {"status": {"eq": [1, 2]}}}), &[]),
            Err(CompileError::UnsupportedLiteral { .. })
        ));
    }

    #[test]
    fn test_relation_lookup_deduplicates_keys() {
        let keys = vec![json!(3), json!(1), json!(3), Value::Null, json!(2)];
        let sql = compile_relation(&orders(), "customer_id", &keys, IdentifierCase::Preserve)
            .unwrap()
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM analytics.orders WHERE (customer_id IN (3, 1, 2))"
        );
    }

    #[test]
    fn test_upper_case_policy() {
        let request = SelectionRequest::from_arguments(
            vec!["status".to_string()],
            json!({"filter": {"status": {"eq": "open"}}, "sort": {"status": "asc"}})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        let sql = compile_select(&orders(), &request, IdentifierCase::Upper)
            .unwrap()
            .to_sql();
        assert_eq!(
            sql,
            "SELECT ID, STATUS FROM ANALYTICS.ORDERS WHERE (STATUS = 'open') ORDER BY STATUS ASC LIMIT 500"
        );
    }
}
