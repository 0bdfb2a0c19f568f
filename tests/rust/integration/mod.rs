//! Integration tests - Tests that wire several components together
//!
//! The warehouse is a `RecordingWarehouse`, so no ClickHouse instance is
//! needed.

mod catalog_tests;
mod graphql_execution_tests;
mod http_api_tests;
