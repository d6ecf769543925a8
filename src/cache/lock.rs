//! Poison-tolerant lock acquisition for the cache maps.
//!
//! A panic while holding a cache lock must not take the whole query path
//! down with it; the worst case of continuing past a poisoned guard is one
//! stale or missing cache entry, which the read path already tolerates.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn note_poisoned(source: &'static str, op: &'static str, mode: &'static str) {
    warn!(
        source,
        op, mode, "cache lock was poisoned; continuing with recovered guard"
    );
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        note_poisoned(source, op, "read");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        note_poisoned(source, op, "write");
        poisoned.into_inner()
    })
}
