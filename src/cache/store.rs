//! Tag-indexed query cache storage.
//!
//! Entries hold materialized DTO sequences behind `Arc<dyn Any>`; the
//! executor downcasts on hit. An entry carries every tag of the entity types
//! its DTOs were projected from, and `invalidate_tags` evicts all entries
//! under any of the given tags. LRU-bounded, with a per-entry TTL checked on
//! read.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use lru::LruCache;
use metrics::counter;

use crate::config::CacheSettings;

use super::keys::{CacheKey, EntityTag};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    tags: Vec<EntityTag>,
    inserted_at: Instant,
}

enum Lookup {
    Hit(Arc<dyn Any + Send + Sync>),
    Expired(Vec<EntityTag>),
    Miss,
}

/// Shared query cache with tag-based group invalidation.
///
/// Constructed once at startup and passed by `Arc` to every executor; there
/// is no hidden global. Invalidation is fire-and-forget relative to in-flight
/// reads: a read that began before a `refresh` may return stale data once.
pub struct QueryCache {
    enabled: bool,
    settings: CacheSettings,
    entries: RwLock<LruCache<CacheKey, CacheEntry>>,
    tag_index: RwLock<HashMap<EntityTag, HashSet<CacheKey>>>,
}

impl QueryCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            settings: settings.clone(),
            entries: RwLock::new(LruCache::new(settings.capacity)),
            tag_index: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a cached value, treating expired entries as misses.
    pub fn get<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<T>> {
        if !self.enabled {
            return None;
        }

        let lookup = {
            let mut entries = rw_write(&self.entries, SOURCE, "get");
            match entries.get(key) {
                Some(entry) if entry.inserted_at.elapsed() < self.settings.ttl => {
                    Lookup::Hit(Arc::clone(&entry.value))
                }
                Some(entry) => Lookup::Expired(entry.tags.clone()),
                None => Lookup::Miss,
            }
        };

        match lookup {
            Lookup::Hit(value) => match value.downcast::<T>() {
                Ok(value) => {
                    counter!("corsia_query_cache_hit_total").increment(1);
                    Some(value)
                }
                // A key can only map to one DTO type; a mismatch means the
                // entry is unusable, so overwrite it via the miss path.
                Err(_) => {
                    counter!("corsia_query_cache_miss_total").increment(1);
                    None
                }
            },
            Lookup::Expired(tags) => {
                rw_write(&self.entries, SOURCE, "get.expire").pop(key);
                self.unindex(key, &tags);
                counter!("corsia_query_cache_expired_total").increment(1);
                counter!("corsia_query_cache_miss_total").increment(1);
                None
            }
            Lookup::Miss => {
                counter!("corsia_query_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Store a value under `key`, indexed by `tags`.
    pub fn insert(&self, key: CacheKey, tags: &[EntityTag], value: Arc<dyn Any + Send + Sync>) {
        if !self.enabled {
            return;
        }

        let displaced = {
            let mut entries = rw_write(&self.entries, SOURCE, "insert");
            entries.push(
                key.clone(),
                CacheEntry {
                    value,
                    tags: tags.to_vec(),
                    inserted_at: Instant::now(),
                },
            )
        };

        // `push` returns either the previous entry under the same key or an
        // entry evicted to make room; both must leave the tag index.
        if let Some((displaced_key, old)) = displaced {
            if displaced_key != key {
                counter!("corsia_query_cache_evict_total").increment(1);
            }
            self.unindex(&displaced_key, &old.tags);
        }

        let mut index = rw_write(&self.tag_index, SOURCE, "insert.index");
        for tag in tags {
            index.entry(*tag).or_default().insert(key.clone());
        }
    }

    /// Evict every entry carrying any of the given tags.
    pub fn invalidate_tags(&self, tags: &[EntityTag]) {
        if !self.enabled {
            return;
        }

        let keys: HashSet<CacheKey> = {
            let mut index = rw_write(&self.tag_index, SOURCE, "invalidate.collect");
            tags.iter()
                .flat_map(|tag| index.remove(tag).unwrap_or_default())
                .collect()
        };

        if keys.is_empty() {
            return;
        }

        let mut residual_tags = Vec::new();
        {
            let mut entries = rw_write(&self.entries, SOURCE, "invalidate.evict");
            for key in &keys {
                if let Some(entry) = entries.pop(key) {
                    residual_tags.push((key.clone(), entry.tags));
                }
            }
        }

        // Evicted entries may carry tags other than the invalidated ones;
        // scrub those index slots too.
        for (key, entry_tags) in residual_tags {
            self.unindex(&key, &entry_tags);
        }

        counter!("corsia_query_cache_invalidated_total").increment(keys.len() as u64);
    }

    /// Evict a single entry.
    pub fn invalidate_key(&self, key: &CacheKey) {
        if let Some(entry) = rw_write(&self.entries, SOURCE, "invalidate_key").pop(key) {
            self.unindex(key, &entry.tags);
        }
    }

    /// Drop all entries and index state.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear.entries").clear();
        rw_write(&self.tag_index, SOURCE, "clear.index").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unindex(&self, key: &CacheKey, tags: &[EntityTag]) {
        let mut index = rw_write(&self.tag_index, SOURCE, "unindex");
        for tag in tags {
            if let Some(keys) = index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    index.remove(tag);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::time::Duration;

    use super::*;

    fn settings(capacity: usize, ttl: Duration) -> CacheSettings {
        CacheSettings {
            enabled: true,
            capacity: NonZeroUsize::new(capacity).expect("capacity"),
            ttl,
        }
    }

    fn value(names: &[&str]) -> Arc<dyn Any + Send + Sync> {
        Arc::new(names.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn insert_then_get_returns_typed_value() {
        let cache = QueryCache::new(&settings(8, Duration::from_secs(300)));
        let key = CacheKey::All(EntityTag::BloodGroup);

        assert!(cache.get::<Vec<String>>(&key).is_none());

        cache.insert(key.clone(), &[EntityTag::BloodGroup], value(&["A+", "O-"]));

        let cached = cache.get::<Vec<String>>(&key).expect("cached value");
        assert_eq!(cached.as_slice(), &["A+".to_string(), "O-".to_string()]);
    }

    #[test]
    fn expired_entries_count_as_misses_and_are_evicted() {
        let cache = QueryCache::new(&settings(8, Duration::ZERO));
        let key = CacheKey::All(EntityTag::City);

        cache.insert(key.clone(), &[EntityTag::City], value(&["Lyon"]));

        assert!(cache.get::<Vec<String>>(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_tags_evicts_only_tagged_entries() {
        let cache = QueryCache::new(&settings(8, Duration::from_secs(300)));
        let beds = CacheKey::All(EntityTag::Bed);
        let cities = CacheKey::All(EntityTag::City);

        cache.insert(
            beds.clone(),
            &[EntityTag::Bed, EntityTag::Room],
            value(&["B-1"]),
        );
        cache.insert(cities.clone(), &[EntityTag::City], value(&["Lyon"]));

        cache.invalidate_tags(&[EntityTag::Room]);

        assert!(cache.get::<Vec<String>>(&beds).is_none());
        assert!(cache.get::<Vec<String>>(&cities).is_some());
    }

    #[test]
    fn multi_tag_entry_falls_to_either_tag() {
        let cache = QueryCache::new(&settings(8, Duration::from_secs(300)));
        let key = CacheKey::All(EntityTag::Bed);

        cache.insert(
            key.clone(),
            &[EntityTag::Bed, EntityTag::Facility],
            value(&["B-1"]),
        );
        cache.invalidate_tags(&[EntityTag::Facility]);
        assert!(cache.get::<Vec<String>>(&key).is_none());

        cache.insert(
            key.clone(),
            &[EntityTag::Bed, EntityTag::Facility],
            value(&["B-1"]),
        );
        cache.invalidate_tags(&[EntityTag::Bed]);
        assert!(cache.get::<Vec<String>>(&key).is_none());
    }

    #[test]
    fn lru_eviction_scrubs_the_tag_index() {
        let cache = QueryCache::new(&settings(1, Duration::from_secs(300)));
        let first = CacheKey::All(EntityTag::City);
        let second = CacheKey::All(EntityTag::Shift);

        cache.insert(first.clone(), &[EntityTag::City], value(&["Lyon"]));
        cache.insert(second.clone(), &[EntityTag::Shift], value(&["Night"]));

        assert!(cache.get::<Vec<String>>(&first).is_none());
        assert!(cache.get::<Vec<String>>(&second).is_some());

        // Invalidating the evicted entry's tag must not disturb the survivor.
        cache.invalidate_tags(&[EntityTag::City]);
        assert!(cache.get::<Vec<String>>(&second).is_some());
    }

    #[test]
    fn disabled_cache_never_stores() {
        let mut config = settings(8, Duration::from_secs(300));
        config.enabled = false;
        let cache = QueryCache::new(&config);
        let key = CacheKey::All(EntityTag::City);

        cache.insert(key.clone(), &[EntityTag::City], value(&["Lyon"]));
        assert!(cache.get::<Vec<String>>(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn same_key_reinsert_replaces_tags() {
        let cache = QueryCache::new(&settings(8, Duration::from_secs(300)));
        let key = CacheKey::All(EntityTag::Bed);

        cache.insert(key.clone(), &[EntityTag::Bed, EntityTag::Room], value(&["B-1"]));
        cache.insert(key.clone(), &[EntityTag::Bed], value(&["B-2"]));

        // The Room tag from the first insert no longer owns this key.
        cache.invalidate_tags(&[EntityTag::Room]);
        let cached = cache.get::<Vec<String>>(&key).expect("still cached");
        assert_eq!(cached.as_slice(), &["B-2".to_string()]);
    }
}
