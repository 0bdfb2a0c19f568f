//! Catalog files through to a generated GraphQL schema.

#[cfg(test)]
mod catalog_tests {
    use std::fs;

    use dalgraph::catalog::{load_catalog, CatalogError, CatalogFormat, CatalogSource};
    use dalgraph::graphql::{CompiledSchema, SchemaBuildError};
    use dalgraph::model::{ModelError, Scalar};

    const SHOP_YAML: &str = r#"
type_dialect: clickhouse
models:
  - name: orders
    description: Placed orders
    table: analytics.orders
    primary_key: order_id
    columns:
      - {name: order_id, type: UInt64}
      - {name: customer_id, type: "Nullable(UInt64)"}
      - {name: placed_at, type: "DateTime64(3)"}
    foreign_keys:
      - {model: customers, on: customer_id}
  - name: customers
    primary_key: customer_id
    columns:
      - {name: customer_id, type: UInt64}
      - {name: name, scalar: string}
"#;

    fn yaml_source(contents: &str) -> (tempfile::TempDir, CatalogSource) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        fs::write(&path, contents).unwrap();
        (dir, CatalogSource::new(path, CatalogFormat::Yaml))
    }

    #[tokio::test]
    async fn test_yaml_catalog_builds_schema() {
        let (_dir, source) = yaml_source(SHOP_YAML);
        let model = load_catalog(&source, None).await.unwrap();

        assert_eq!(model.len(), 2);
        assert_eq!(model.relation_count(), 1);
        let orders = model.entity("orders").unwrap();
        assert_eq!(orders.table(), "analytics.orders");
        assert_eq!(orders.column("placed_at").unwrap().scalar, Scalar::DateTime);

        let sdl = CompiledSchema::build(model).unwrap().sdl();
        assert!(sdl.contains("type orders"));
        assert!(sdl.contains("customers: [customers]"));
        assert!(sdl.contains("input filter_orders_placed_at"));
    }

    #[tokio::test]
    async fn test_unknown_foreign_key_target() {
        let (_dir, source) = yaml_source(
            "models:\n  - name: orders\n    primary_key: id\n    columns: [{name: id, type: UInt64}]\n    foreign_keys: [{model: ghosts, on: id}]\n",
        );
        let err = load_catalog(&source, None).await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::Model(ModelError::UnknownEntity {
                entity: "ghosts".to_string()
            })
        );
        assert_eq!(
            err.to_string(),
            "cannot create foreign key: `ghosts` is not a valid model"
        );
    }

    #[tokio::test]
    async fn test_generated_name_collision_fails_build() {
        let (_dir, source) = yaml_source(
            "models:\n  - name: orders\n    primary_key: id\n    columns: [{name: id, type: UInt64}]\n  - name: orders_sort\n    primary_key: id\n    columns: [{name: id, type: UInt64}]\n",
        );
        let model = load_catalog(&source, None).await.unwrap();
        assert!(matches!(
            CompiledSchema::build(model),
            Err(SchemaBuildError::DuplicateTypeName { .. })
        ));
    }

    #[tokio::test]
    async fn test_dbt_project() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(
            target.join("manifest.json"),
            r#"{
                "metadata": {"adapter_type": "clickhouse"},
                "nodes": {
                    "model.shop.customers": {
                        "unique_id": "model.shop.customers",
                        "resource_type": "model",
                        "name": "customers",
                        "schema": "analytics",
                        "columns": {"customer_id": {"name": "customer_id"}},
                        "config": {"meta": {"dal": {"expose": true, "primary_key": "customer_id"}}}
                    },
                    "model.shop.staging": {
                        "unique_id": "model.shop.staging",
                        "resource_type": "model",
                        "name": "staging",
                        "columns": {}
                    }
                }
            }"#,
        )
        .unwrap();
        fs::write(
            target.join("catalog.json"),
            r#"{"nodes": {"model.shop.customers": {"columns": {"CUSTOMER_ID": {"type": "UInt32", "index": 1}}}}}"#,
        )
        .unwrap();

        let source = CatalogSource::new(dir.path(), CatalogFormat::Dbt);
        let model = load_catalog(&source, None).await.unwrap();
        assert_eq!(model.len(), 1);
        let customers = model.entity("customers").unwrap();
        assert_eq!(customers.table(), "analytics.customers");
        assert_eq!(
            customers.column("customer_id").unwrap().scalar,
            Scalar::Integer
        );
    }
}
