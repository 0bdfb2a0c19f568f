//! # GraphQL Surface
//!
//! A [`CompiledSchema`] is generated once per catalog load and shared by all
//! requests. Every execution gets its own [`RequestScope`], which carries the
//! warehouse handle and the per-request batchers.
//!
//! For an entity `foo` with an `Int` column `a` and a `String` column `b` the
//! generated surface is:
//!
//! ```graphql
//! type RootQuery {
//!   foo(limit: Int = 500, offset: Int = 0, filter: foo_filter, sort: foo_sort): [foo]
//! }
//! input foo_filter { a: filter_foo_a  b: filter_foo_b }
//! input filter_foo_a { eq: Int  neq: Int  lt: Int  gt: Int  lte: Int  gte: Int }
//! input filter_foo_b { eq: String  neq: String  lt: String  gt: String  lte: String  gte: String }
//! input foo_sort { a: direction  b: direction }
//! enum direction { asc desc }
//! ```

pub mod builder;
pub mod errors;
pub mod resolvers;
pub mod types;

use std::sync::Arc;

use async_graphql::dynamic::Schema as DynamicSchema;
use async_graphql::{Request, Response};

pub use builder::SchemaBuilder;
pub use errors::{ResolveError, SchemaBuildError};

use crate::loader::RequestScope;
use crate::model::Schema;

pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    types {
      kind
      name
      description
      fields {
        name
        description
        args { name type { kind name ofType { kind name } } defaultValue }
        type { kind name ofType { kind name } }
      }
      inputFields {
        name
        type { kind name ofType { kind name } }
      }
      enumValues { name }
    }
  }
}
"#;

pub struct CompiledSchema {
    schema: DynamicSchema,
    model: Arc<Schema>,
}

impl CompiledSchema {
    pub fn build(model: Arc<Schema>) -> Result<Self, SchemaBuildError> {
        let schema = SchemaBuilder::new(model.clone()).build()?;
        log::info!(
            "Generated GraphQL schema for {} entities and {} relations",
            model.len(),
            model.relation_count()
        );
        Ok(CompiledSchema { schema, model })
    }

    pub fn model(&self) -> &Arc<Schema> {
        &self.model
    }

    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    pub async fn execute(&self, request: impl Into<Request>, scope: RequestScope) -> Response {
        let request = request.into().data(scope);
        self.schema.execute(request).await
    }

    /// Result of the standard introspection query as JSON.
    pub async fn introspect(&self) -> serde_json::Value {
        let response = self.schema.execute(Request::new(INTROSPECTION_QUERY)).await;
        if !response.errors.is_empty() {
            log::warn!("Introspection returned errors: {:?}", response.errors);
        }
        response.data.into_json().unwrap_or(serde_json::Value::Null)
    }
}
