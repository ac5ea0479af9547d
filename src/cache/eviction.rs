//! Eviction Policy Module
//!
//! Picks eviction victims by a composite recency/frequency score.

use std::collections::HashMap;

use crate::cache::CacheEntry;

/// Milliseconds of recency credited per recorded access.
pub const FREQUENCY_WEIGHT_MS: u64 = 1000;

// == Score ==
/// Computes the eviction score of an entry. Lower scores are evicted first.
///
/// `score = last_accessed + access_count * FREQUENCY_WEIGHT_MS`
pub fn eviction_score<V>(entry: &CacheEntry<V>) -> u64 {
    entry
        .last_accessed
        .saturating_add(entry.access_count.saturating_mul(FREQUENCY_WEIGHT_MS))
}

// == Space Request ==
/// Amount of room an insertion needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceNeeded {
    /// Bytes that must be freed
    pub bytes: usize,
    /// Entries that must be freed
    pub slots: usize,
}

impl SpaceNeeded {
    /// Returns true when nothing has to be freed.
    pub fn is_satisfied(&self) -> bool {
        self.bytes == 0 && self.slots == 0
    }
}

// == Select Victims ==
/// Returns keys to evict, lowest score first, until `needed` is covered.
///
/// `protected` is never selected (the key being overwritten). If every
/// candidate is consumed without covering `needed`, all candidates are
/// returned and the caller decides what to do.
pub fn select_victims<V>(
    entries: &HashMap<String, CacheEntry<V>>,
    needed: SpaceNeeded,
    protected: Option<&str>,
) -> Vec<String> {
    if needed.is_satisfied() {
        return Vec::new();
    }

    let mut candidates: Vec<(u64, u64, &String, usize)> = entries
        .iter()
        .filter(|(key, _)| Some(key.as_str()) != protected)
        .map(|(key, entry)| (eviction_score(entry), entry.sequence, key, entry.size))
        .collect();

    candidates.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut freed_bytes = 0usize;
    let mut freed_slots = 0usize;
    let mut victims = Vec::new();

    for (_, _, key, size) in candidates {
        if freed_bytes >= needed.bytes && freed_slots >= needed.slots {
            break;
        }
        freed_bytes += size;
        freed_slots += 1;
        victims.push(key.clone());
    }

    victims
}
