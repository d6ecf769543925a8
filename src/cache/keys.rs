//! Cache key definitions.
//!
//! `EntityTag` labels an entity type for group invalidation; `CacheKey` is a
//! deterministic function of a query's identity and parameters. Two queries
//! with identical parameters always map to the same key.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use uuid::Uuid;

use super::store::QueryCache;

/// Entity type label grouping cache entries for bulk invalidation.
///
/// A cached DTO list that joins several entity types carries one tag per
/// joined type, so a mutation to any of them evicts the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTag {
    City,
    Nationality,
    MaritalStatus,
    BloodGroup,
    Shift,
    Facility,
    Department,
    Room,
    Bed,
    Staff,
    Patient,
    Visit,
    Encounter,
    UserFavorite,
}

/// Query cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full-collection query for one entity type.
    All(EntityTag),
    /// Point lookup by identifier.
    ById { tag: EntityTag, id: Uuid },
    /// Filtered collection, keyed by a hash of the filter parameters.
    Filtered { tag: EntityTag, filter_hash: u64 },
    /// Paginated collection.
    Page {
        tag: EntityTag,
        filter_hash: u64,
        page: u32,
        per_page: u32,
    },
    /// Per-user collection (favorites).
    ForUser { tag: EntityTag, user_hash: u64 },
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Invalidation handle bound to one entity type.
///
/// Services hold one scope per entity they own; key construction stays in
/// the query descriptors, and `refresh` delegates tag eviction to the shared
/// [`QueryCache`].
#[derive(Clone)]
pub struct CacheScope {
    tag: EntityTag,
    cache: Arc<QueryCache>,
}

impl CacheScope {
    pub fn new(tag: EntityTag, cache: Arc<QueryCache>) -> Self {
        Self { tag, cache }
    }

    /// Evict every cache entry tagged with this scope's entity type.
    ///
    /// Mutation handlers call this after persisting a change.
    pub fn refresh(&self) {
        self.cache.invalidate_tags(&[self.tag]);
    }
}
