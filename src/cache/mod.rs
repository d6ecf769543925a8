//! Corsia query cache.
//!
//! Read queries materialize DTO sequences; cacheable ones are stored here
//! under deterministic keys and grouped by entity tags so a mutation to any
//! entity type can evict every dependent entry in one call.
//!
//! Behavior is controlled via `corsia.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1024
//! ttl_seconds = 300
//! ```

mod keys;
mod lock;
mod store;

pub use keys::{CacheKey, CacheScope, EntityTag, hash_value};
pub use store::QueryCache;
