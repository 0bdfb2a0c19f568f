//! # Batch-Load Engine
//!
//! Relation fields never query the warehouse themselves. They hand their
//! parent's key to the request's [`RequestScope`], which routes it to the
//! [`RelationBatcher`] for that relation. All keys queued during one
//! collection window are fetched with a single statement, so a list of K
//! parents costs one relation query instead of K.
//!
//! Batchers live exactly as long as the request that created them; no rows
//! are cached across requests.

pub mod batcher;
pub mod errors;
pub mod scope;
pub mod slot;

pub use batcher::{canonical_key, Batch, BatchState, Deferred, RelationBatcher, RelationLoader};
pub use errors::LoadError;
pub use scope::{CancelOnDrop, RequestScope};
