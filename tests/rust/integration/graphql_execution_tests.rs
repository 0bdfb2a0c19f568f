//! Queries executed end to end against a scripted warehouse.

#[cfg(test)]
mod graphql_execution_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{json, Value};

    use dalgraph::graphql::CompiledSchema;
    use dalgraph::loader::RequestScope;
    use dalgraph::model::{Scalar, Schema};
    use dalgraph::warehouse::{IdentifierCase, RecordingWarehouse, WarehouseClient};

    /// `foo {a, b, c}` and `bar {x, y, z}`, where `bar.foo` joins `foo.a` on `bar.x`.
    fn foo_bar() -> Arc<Schema> {
        let mut schema = Schema::new();
        let foo = schema.add_entity("foo", "", "a").unwrap();
        for column in ["a", "b", "c"] {
            foo.add_column(column, "", Scalar::Integer).unwrap();
        }
        let bar = schema.add_entity("bar", "", "x").unwrap();
        for column in ["x", "y", "z"] {
            bar.add_column(column, "", Scalar::Integer).unwrap();
        }
        schema.add_foreign_key("bar", "foo", "a").unwrap();
        Arc::new(schema)
    }

    /// `bar {x}` -> `foo {a, f}` joined on `foo.f`, then `foo` -> `baz {k, fid}`
    /// joined on `baz.fid`.
    fn bar_foo_baz() -> Arc<Schema> {
        let mut schema = Schema::new();
        let bar = schema.add_entity("bar", "", "x").unwrap();
        bar.add_column("x", "", Scalar::Integer).unwrap();
        let foo = schema.add_entity("foo", "", "a").unwrap();
        for column in ["a", "f"] {
            foo.add_column(column, "", Scalar::Integer).unwrap();
        }
        let baz = schema.add_entity("baz", "", "k").unwrap();
        for column in ["k", "fid"] {
            baz.add_column(column, "", Scalar::Integer).unwrap();
        }
        schema.add_foreign_key("bar", "foo", "f").unwrap();
        schema.add_foreign_key("foo", "baz", "fid").unwrap();
        Arc::new(schema)
    }

    async fn execute_on(
        model: Arc<Schema>,
        query: &str,
        warehouse: Arc<RecordingWarehouse>,
        batch_delay: Duration,
    ) -> (Value, Value) {
        let schema = CompiledSchema::build(model).unwrap();
        let scope = RequestScope::new(warehouse as Arc<dyn WarehouseClient>, batch_delay);
        let response = schema.execute(query, scope).await;
        let body = serde_json::to_value(&response).unwrap();
        (body["data"].clone(), body["errors"].clone())
    }

    async fn execute(query: &str, warehouse: Arc<RecordingWarehouse>) -> (Value, Value) {
        execute_on(foo_bar(), query, warehouse, Duration::from_millis(1)).await
    }

    #[tokio::test]
    async fn test_nested_relation_uses_one_batched_query() {
        let warehouse = Arc::new(
            RecordingWarehouse::new()
                .respond_to("FROM bar", vec![json!({"x": 1}), json!({"x": 2}), json!({"x": 3})])
                .respond_to(
                    "FROM foo",
                    vec![json!({"a": 1, "b": 10}), json!({"a": 2, "b": 20}), json!({"a": 2, "b": 21})],
                ),
        );
        let (data, errors) = execute("{ bar { x foo { a b } } }", warehouse.clone()).await;

        assert!(errors.is_null(), "{}", errors);
        assert_eq!(
            warehouse.statements(),
            vec![
                "SELECT x FROM bar LIMIT 500",
                "SELECT * FROM foo WHERE (a IN (1, 2, 3))",
            ]
        );
        assert_eq!(
            data,
            json!({"bar": [
                {"x": 1, "foo": [{"a": 1, "b": 10}]},
                {"x": 2, "foo": [{"a": 2, "b": 20}, {"a": 2, "b": 21}]},
                {"x": 3, "foo": []},
            ]})
        );
    }

    #[tokio::test]
    async fn test_each_relation_tier_is_one_query() {
        const PARENTS: i64 = 300;
        for batch_delay in [Duration::ZERO, Duration::from_millis(1)] {
            let bars = (0..PARENTS).map(|x| json!({"x": x})).collect();
            let foos = (0..PARENTS)
                .flat_map(|x| [json!({"a": 2 * x, "f": x}), json!({"a": 2 * x + 1, "f": x})])
                .collect();
            let bazs = (0..2 * PARENTS).map(|k| json!({"k": k, "fid": k})).collect();
            let warehouse = Arc::new(
                RecordingWarehouse::new()
                    .respond_to("FROM bar", bars)
                    .respond_to("FROM foo", foos)
                    .respond_to("FROM baz", bazs),
            );

            let (data, errors) = execute_on(
                bar_foo_baz(),
                "{ bar(limit: 1000) { x foo { a baz { k } } } }",
                warehouse.clone(),
                batch_delay,
            )
            .await;

            assert!(errors.is_null(), "{}", errors);
            let statements = warehouse.statements();
            assert_eq!(statements.len(), 3, "{:?}: {:?}", batch_delay, statements);
            assert_eq!(statements[0], "SELECT x FROM bar LIMIT 1000");
            assert!(statements[1].starts_with("SELECT * FROM foo WHERE (f IN ("));
            assert!(statements[2].starts_with("SELECT * FROM baz WHERE (fid IN ("));
            assert_eq!(statements[2].matches(", ").count() as i64, 2 * PARENTS - 1);

            let last = &data["bar"][(PARENTS - 1) as usize];
            assert_eq!(last["x"], json!(PARENTS - 1));
            assert_eq!(
                last["foo"],
                json!([
                    {"a": 2 * PARENTS - 2, "baz": [{"k": 2 * PARENTS - 2}]},
                    {"a": 2 * PARENTS - 1, "baz": [{"k": 2 * PARENTS - 1}]},
                ])
            );
        }
    }

    #[tokio::test]
    async fn test_failed_batch_reported_at_every_parent() {
        let warehouse = Arc::new(
            RecordingWarehouse::new()
                .respond_to("FROM bar", vec![json!({"x": 1}), json!({"x": 2})])
                .fail_on("FROM foo", "Code: 60. Table default.foo does not exist"),
        );
        let (data, errors) = execute("{ bar { x foo { a } } }", warehouse.clone()).await;

        assert_eq!(warehouse.statements().len(), 2);
        assert_eq!(
            data,
            json!({"bar": [{"x": 1, "foo": null}, {"x": 2, "foo": null}]})
        );
        let errors = errors.as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["message"], errors[1]["message"]);
        assert_eq!(errors[0]["extensions"]["code"], "EXECUTION_ERROR");
        let mut paths = errors.iter().map(|e| e["path"].clone()).collect::<Vec<_>>();
        paths.sort_by_key(|p| p.to_string());
        assert_eq!(paths, vec![json!(["bar", 0, "foo"]), json!(["bar", 1, "foo"])]);
    }

    #[tokio::test]
    async fn test_upper_case_identifiers_round_trip() {
        let warehouse = Arc::new(
            RecordingWarehouse::new()
                .with_identifier_case(IdentifierCase::Upper)
                .respond_to("FROM BAR", vec![json!({"X": 5, "Y": 6})])
                .respond_to("FROM FOO", vec![json!({"A": 5, "C": 7})]),
        );
        let (data, errors) = execute("{ bar { y foo { c } } }", warehouse.clone()).await;

        assert!(errors.is_null(), "{}", errors);
        assert_eq!(
            warehouse.statements(),
            vec![
                "SELECT X, Y FROM BAR LIMIT 500",
                "SELECT * FROM FOO WHERE (A IN (5))",
            ]
        );
        assert_eq!(data, json!({"bar": [{"y": 6, "foo": [{"c": 7}]}]}));
    }

    #[tokio::test]
    async fn test_null_parent_key_yields_empty_list() {
        let warehouse = Arc::new(
            RecordingWarehouse::new().respond_to("FROM bar", vec![json!({"x": null, "y": 1})]),
        );
        let (data, errors) = execute("{ bar { y foo { a } } }", warehouse.clone()).await;

        assert!(errors.is_null(), "{}", errors);
        assert_eq!(warehouse.statements().len(), 1);
        assert_eq!(data, json!({"bar": [{"y": 1, "foo": []}]}));
    }

    #[tokio::test]
    async fn test_sibling_root_fields_are_independent() {
        let warehouse = Arc::new(
            RecordingWarehouse::new().respond_to("FROM bar", vec![json!({"x": 1})]),
        );
        let (data, errors) = execute(
            "{ foo(filter: {a: {gt: null}}) { a } bar { x } }",
            warehouse.clone(),
        )
        .await;

        assert_eq!(data, json!({"foo": null, "bar": [{"x": 1}]}));
        assert_eq!(errors[0]["extensions"]["code"], "COMPILE_ERROR");
        assert_eq!(warehouse.statements(), vec!["SELECT x FROM bar LIMIT 500"]);
    }
}
