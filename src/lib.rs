//! dalgraph - GraphQL data access layer over warehouse tables
//!
//! This crate exposes warehouse tables through a generated GraphQL API:
//! - Entity model loaded from a YAML catalog or a dbt project
//! - Dynamic GraphQL schema with filter, sort and pagination arguments
//! - One SELECT per root field, batched IN lookups for relations
//! - ClickHouse as the execution backend

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod graphql;
pub mod loader;
pub mod model;
pub mod server;
pub mod warehouse;
