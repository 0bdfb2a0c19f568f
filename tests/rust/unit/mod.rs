//! Unit tests - Tests that exercise one component through its public API
//!
//! None of these need a running warehouse.

mod sql_generation_tests;
mod type_mapping_tests;
