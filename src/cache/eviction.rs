//! Eviction Policy Module
//!
//! Picks the victim when the cache is full: the entry that expires soonest.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Soonest Expiring ==
/// Returns the key of the entry with the smallest `expires_at`.
///
/// Ties are broken by key so the choice does not depend on hash order.
/// Returns None if there are no entries.
pub fn soonest_expiring<V>(entries: &HashMap<String, CacheEntry<V>>) -> Option<String> {
    entries
        .iter()
        .min_by(|(ka, a), (kb, b)| a.expires_at.cmp(&b.expires_at).then_with(|| ka.cmp(kb)))
        .map(|(key, _)| key.clone())
}
