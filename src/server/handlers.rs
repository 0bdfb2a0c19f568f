use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_graphql::http::GraphiQLSource;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::{
    graphql::CompiledSchema,
    loader::RequestScope,
    warehouse::{RecordingWarehouse, WarehouseClient},
};

use super::{
    models::{ErrorResponse, HealthResponse, ReloadResponse, SqlOnlyResponse},
    AppState,
};

/// Performance metrics for one GraphQL request
#[derive(Debug, Clone)]
pub struct QueryPerformanceMetrics {
    pub request_id: String,
    pub total_time: f64,
    pub execution_time: f64,
    pub sql_queries_count: usize,
    pub error_count: usize,
}

impl QueryPerformanceMetrics {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            total_time: 0.0,
            execution_time: 0.0,
            sql_queries_count: 0,
            error_count: 0,
        }
    }

    pub fn log_performance(&self, query: &str) {
        log::info!(
            "[{}] Query performance - Total: {:.3}ms, Exec: {:.3}ms, Queries: {}, Errors: {}",
            self.request_id,
            self.total_time * 1000.0,
            self.execution_time * 1000.0,
            self.sql_queries_count,
            self.error_count
        );

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Performance breakdown for query: {}",
                query.chars().take(100).collect::<String>()
            );
        }
    }

    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "X-Query-Total-Time",
                format!("{:.3}ms", self.total_time * 1000.0),
            ),
            (
                "X-Query-Execution-Time",
                format!("{:.3}ms", self.execution_time * 1000.0),
            ),
            ("X-Query-SQL-Count", self.sql_queries_count.to_string()),
            ("X-Request-Id", self.request_id.clone()),
        ]
    }
}

/// Executes `request`, cancelling the scope once `timeout` elapses. Fields
/// still waiting on the warehouse then resolve with `CANCELLED` errors.
pub async fn execute_with_timeout(
    schema: &CompiledSchema,
    request: async_graphql::Request,
    scope: RequestScope,
    timeout: Duration,
) -> async_graphql::Response {
    let timer = {
        let scope = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            log::warn!(
                "[{}] Request exceeded {:?}, cancelling pending queries",
                scope.id(),
                timeout
            );
            scope.cancel();
        })
    };
    let response = schema.execute(request, scope).await;
    timer.abort();
    response
}

/// Simple health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let schema = app_state.current_schema().await;
    Json(HealthResponse {
        service: "dalgraph".to_string(),
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        entities: schema.model().len(),
        relations: schema.model().relation_count(),
        warehouse_connected: app_state.is_connected(),
    })
}

pub async fn graphiql_handler(State(app_state): State<Arc<AppState>>) -> Response {
    if !app_state.config.graphiql {
        return StatusCode::NOT_FOUND.into_response();
    }
    Html(GraphiQLSource::build().endpoint("/graphql").finish()).into_response()
}

pub async fn graphql_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<async_graphql::Request>,
) -> Response {
    let start_time = Instant::now();
    let schema = app_state.current_schema().await;
    let scope = RequestScope::new(app_state.warehouse(), app_state.config.batch_delay());
    let mut metrics = QueryPerformanceMetrics::new(scope.id().to_string());
    let query = request.query.clone();

    log::debug!("[{}] GraphQL request: {}", scope.id(), query);

    // a dropped handler future means the client went away
    let _cancel_guard = scope.cancel_on_drop();
    let execution_start = Instant::now();
    let response = execute_with_timeout(
        &schema,
        request,
        scope.clone(),
        app_state.config.request_timeout(),
    )
    .await;
    metrics.execution_time = execution_start.elapsed().as_secs_f64();
    metrics.sql_queries_count = scope.statement_count();
    metrics.error_count = response.errors.len();
    metrics.total_time = start_time.elapsed().as_secs_f64();
    metrics.log_performance(&query);

    let mut http_response = Json(response).into_response();
    let headers = http_response.headers_mut();
    for (name, value) in metrics.to_headers() {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
    http_response
}

/// Runs a query against a recording warehouse and returns the statements it
/// produced. Nothing reaches the real warehouse; since no rows come back,
/// relation statements are never issued.
pub async fn sql_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<async_graphql::Request>,
) -> Json<SqlOnlyResponse> {
    let schema = app_state.current_schema().await;
    let recorder =
        Arc::new(RecordingWarehouse::new().with_identifier_case(app_state.config.identifier_case));
    let scope = RequestScope::new(
        recorder.clone() as Arc<dyn WarehouseClient>,
        app_state.config.batch_delay(),
    );
    let query = request.query.clone();

    let response = schema.execute(request, scope).await;
    let errors = response
        .errors
        .iter()
        .filter_map(|error| serde_json::to_value(error).ok())
        .collect();

    Json(SqlOnlyResponse {
        query,
        sql: recorder.statements(),
        errors,
    })
}

pub async fn schema_handler(State(app_state): State<Arc<AppState>>) -> String {
    app_state.current_schema().await.sdl()
}

pub async fn reload_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, (StatusCode, Json<ErrorResponse>)> {
    match app_state.reload().await {
        Ok(schema) => Ok(Json(ReloadResponse {
            message: "Schema reloaded successfully".to_string(),
            entities: schema.model().len(),
            relations: schema.model().relation_count(),
        })),
        Err(e) => {
            log::error!("Schema reload failed, keeping the previous schema: {}", e);
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: format!("Failed to reload schema: {}", e),
                }),
            ))
        }
    }
}
