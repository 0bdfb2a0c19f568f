//! HTTP routes served from a catalog file on disk.

#[cfg(test)]
mod http_api_tests {
    use std::fs;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use dalgraph::config::ServerConfig;
    use dalgraph::server::{router, AppState};
    use dalgraph::warehouse::{RecordingWarehouse, WarehouseClient};

    const CATALOG: &str = r#"
models:
  - name: customers
    primary_key: id
    columns:
      - {name: id, type: UInt64}
      - {name: name, type: String}
    foreign_keys:
      - {model: orders, on: customer_id}
  - name: orders
    primary_key: order_id
    columns:
      - {name: order_id, type: UInt64}
      - {name: customer_id, type: UInt64}
"#;

    async fn app_state(
        dir: &tempfile::TempDir,
        warehouse: Arc<RecordingWarehouse>,
    ) -> Arc<AppState> {
        let path = dir.path().join("catalog.yaml");
        fs::write(&path, CATALOG).unwrap();
        let config = ServerConfig {
            catalog_path: path.display().to_string(),
            ..Default::default()
        };
        Arc::new(
            AppState::initialize(config, Some(warehouse as Arc<dyn WarehouseClient>))
                .await
                .unwrap(),
        )
    }

    async fn post(app_state: Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router(app_state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_graphql_endpoint_runs_nested_query() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Arc::new(
            RecordingWarehouse::new()
                .respond_to("FROM customers", vec![json!({"id": 1, "name": "Ada"})])
                .respond_to("FROM orders", vec![json!({"order_id": 9, "customer_id": 1})]),
        );
        let state = app_state(&dir, warehouse.clone()).await;

        let (status, body) = post(
            state,
            "/graphql",
            json!({"query": "query Q($n: Int) { customers(limit: $n) { name orders { order_id } } }", "variables": {"n": 1}}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({"customers": [{"name": "Ada", "orders": [{"order_id": 9}]}]})
        );
        assert_eq!(
            warehouse.statements(),
            vec![
                "SELECT id, name FROM customers LIMIT 1",
                "SELECT * FROM orders WHERE (customer_id IN (1))",
            ]
        );
    }

    #[tokio::test]
    async fn test_sql_endpoint_reports_root_statements() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Arc::new(RecordingWarehouse::new());
        let state = app_state(&dir, warehouse.clone()).await;

        let (status, body) = post(
            state,
            "/graphql/sql",
            json!({"query": "{ customers(sort: {name: desc}) { name orders { order_id } } orders { order_id } }"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let mut sql = body["sql"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        sql.sort();
        assert_eq!(
            sql,
            vec![
                "SELECT id, name FROM customers ORDER BY name DESC LIMIT 500",
                "SELECT order_id FROM orders LIMIT 500",
            ]
        );
        assert!(warehouse.statements().is_empty());
    }

    #[tokio::test]
    async fn test_reload_picks_up_catalog_changes() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir, Arc::new(RecordingWarehouse::new())).await;

        fs::write(
            dir.path().join("catalog.yaml"),
            "models:\n  - name: invoices\n    primary_key: id\n    columns: [{name: id, type: UInt64}]\n",
        )
        .unwrap();
        let (status, body) = post(state.clone(), "/schema/reload", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entities"], 1);

        let sdl = state.current_schema().await.sdl();
        assert!(sdl.contains("invoices_filter"));
        assert!(!sdl.contains("customers_filter"));

        fs::write(dir.path().join("catalog.yaml"), "models: [").unwrap();
        let (status, body) = post(state.clone(), "/schema/reload", json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("Failed to reload schema"));
        assert!(state.current_schema().await.sdl().contains("invoices_filter"));
    }
}
