//! Token -> section location postings, accumulated across scans.
//!
//! Two maps are kept side by side: the **full** index covers the whole
//! corpus and is what gets persisted, the **delta** index covers only the
//! tokens touched by the current scan and decides which per-token output
//! files must be rewritten. Location lists are deques so that
//! title-priority matches can be pushed to the front in O(1).

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, VecDeque};

/// Incrementally built token -> locations map
#[derive(Debug, Default)]
pub struct InvertedIndex {
    full: FxHashMap<String, VecDeque<String>>,
    delta: FxHashMap<String, VecDeque<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full index from a persisted snapshot
    pub fn load_full(&mut self, snapshot: impl IntoIterator<Item = (String, Vec<String>)>) {
        self.full = snapshot
            .into_iter()
            .map(|(token, locations)| (token, VecDeque::from(locations)))
            .collect();
    }

    /// Record one token occurrence. Title-priority matches go to the front
    /// of the list (most recent first), body matches to the back.
    pub fn record(&mut self, token: &str, location: &str, prioritized: bool) {
        for map in [&mut self.full, &mut self.delta] {
            let list = map.entry(token.to_string()).or_default();
            if prioritized {
                list.push_front(location.to_string());
            } else {
                list.push_back(location.to_string());
            }
        }
    }

    /// Strip every removed location from the full index. Tokens drained to
    /// empty are dropped and returned (sorted) so the caller can remove
    /// them from the trie and delete their on-disk artifacts.
    pub fn prune(&mut self, removed: &FxHashSet<String>) -> Vec<String> {
        if removed.is_empty() {
            return Vec::new();
        }

        let mut dropped = Vec::new();
        self.full.retain(|token, locations| {
            locations.retain(|loc| !removed.contains(loc));
            if locations.is_empty() {
                dropped.push(token.clone());
                false
            } else {
                true
            }
        });
        dropped.sort_unstable();
        dropped
    }

    /// Deduplicated, order-preserving locations for one token
    pub fn locations(&self, token: &str) -> Vec<String> {
        self.full
            .get(token)
            .map(|list| dedup_preserving(list))
            .unwrap_or_default()
    }

    /// Tokens touched by the current scan, sorted for deterministic output
    pub fn touched_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<_> = self.delta.keys().cloned().collect();
        tokens.sort_unstable();
        tokens
    }

    /// Full index as persisted: deterministic key order, deduplicated
    /// order-preserving location lists.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.full
            .iter()
            .map(|(token, locations)| (token.clone(), dedup_preserving(locations)))
            .collect()
    }

    /// Number of tokens in the full index
    pub fn len(&self) -> usize {
        self.full.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

fn dedup_preserving(locations: &VecDeque<String>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    locations
        .iter()
        .filter(|loc| seen.insert(loc.as_str()))
        .cloned()
        .collect()
}
