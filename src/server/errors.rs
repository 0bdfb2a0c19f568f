use thiserror::Error;

use crate::catalog::CatalogError;
use crate::graphql::SchemaBuildError;

/// Failures that stop the server from starting, or a reload from applying.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("failed to build GraphQL schema: {0}")]
    Schema(#[from] SchemaBuildError),

    #[error("failed to bind HTTP listener to {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}
