use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use handlers::{
    graphiql_handler, graphql_handler, health_check, reload_handler, schema_handler, sql_handler,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer};

use crate::catalog::load_catalog;
use crate::config::ServerConfig;
use crate::graphql::CompiledSchema;
use crate::warehouse::{ClickHouseWarehouse, UnconfiguredWarehouse, WarehouseClient};

pub mod errors;
pub mod handlers;
pub mod models;

pub use errors::ServerError;

const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

pub struct AppState {
    schema: RwLock<Arc<CompiledSchema>>,
    warehouse: Arc<dyn WarehouseClient>,
    connected: bool,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        schema: CompiledSchema,
        warehouse: Arc<dyn WarehouseClient>,
        connected: bool,
        config: ServerConfig,
    ) -> Self {
        AppState {
            schema: RwLock::new(Arc::new(schema)),
            warehouse,
            connected,
            config,
        }
    }

    /// Loads the catalog named by `config` and builds the first schema.
    /// Without a warehouse every executed statement fails, but SQL-only
    /// requests still work.
    pub async fn initialize(
        config: ServerConfig,
        warehouse: Option<Arc<dyn WarehouseClient>>,
    ) -> Result<Self, ServerError> {
        let connected = warehouse.is_some();
        let warehouse = warehouse.unwrap_or_else(|| {
            Arc::new(UnconfiguredWarehouse {
                identifier_case: config.identifier_case,
            })
        });
        let discovery = connected.then_some(warehouse.as_ref());
        let schema = load_schema(&config, discovery).await?;
        Ok(AppState::new(schema, warehouse, connected, config))
    }

    pub async fn current_schema(&self) -> Arc<CompiledSchema> {
        self.schema.read().await.clone()
    }

    pub fn warehouse(&self) -> Arc<dyn WarehouseClient> {
        self.warehouse.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Rebuilds the schema from the catalog. Requests already running keep
    /// the schema they started with; on failure the current schema stays.
    pub async fn reload(&self) -> Result<Arc<CompiledSchema>, ServerError> {
        let discovery = self.connected.then_some(self.warehouse.as_ref());
        let schema = Arc::new(load_schema(&self.config, discovery).await?);
        *self.schema.write().await = schema.clone();
        log::info!("Schema reloaded from {}", self.config.catalog_path);
        Ok(schema)
    }
}

pub async fn load_schema(
    config: &ServerConfig,
    warehouse: Option<&dyn WarehouseClient>,
) -> Result<CompiledSchema, ServerError> {
    let model = load_catalog(&config.catalog_source(), warehouse).await?;
    Ok(CompiledSchema::build(model)?)
}

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/graphql", get(graphiql_handler).post(graphql_handler))
        .route("/graphql/sql", post(sql_handler))
        .route("/schema", get(schema_handler))
        .route("/schema/reload", post(reload_handler))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(CatchPanicLayer::new())
        .with_state(app_state)
}

pub async fn run_with_config(config: ServerConfig) -> Result<(), ServerError> {
    log::info!(
        "Server configuration: http={}:{}, catalog={} ({:?}), identifier_case={:?}, batch_delay={}ms, timeout={}s",
        config.http_host,
        config.http_port,
        config.catalog_path,
        config.catalog_format,
        config.identifier_case,
        config.batch_delay_ms,
        config.request_timeout_secs
    );

    let warehouse = ClickHouseWarehouse::from_env(config.identifier_case)
        .map(|warehouse| Arc::new(warehouse) as Arc<dyn WarehouseClient>);
    if warehouse.is_some() {
        log::info!("ClickHouse client created successfully");
    } else {
        log::warn!("No ClickHouse configuration found (CLICKHOUSE_URL, CLICKHOUSE_USER); queries will fail, SQL-only mode still works");
    }

    let app_state = Arc::new(AppState::initialize(config.clone(), warehouse).await?);

    let http_bind_address = format!("{}:{}", config.http_host, config.http_port);
    log::info!("Starting HTTP server on {}", http_bind_address);

    let http_listener =
        TcpListener::bind(&http_bind_address)
            .await
            .map_err(|source| ServerError::Bind {
                address: http_bind_address.clone(),
                source,
            })?;

    println!("dalgraph server is running");
    println!("  GraphQL API: http://{}/graphql", http_bind_address);

    axum::serve(http_listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    println!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => println!("Received SIGTERM, shutting down..."),
                    _ = tokio::signal::ctrl_c() => println!("Received SIGINT, shutting down..."),
                }
            }
            Err(e) => {
                log::error!("Failed to register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        println!("Received shutdown signal, shutting down...");
    }
}
