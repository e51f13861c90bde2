// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-entity stat cache (spec.md §4.5): populated lazily, invalidated by
//! `reset`, by mutating operations, and by re-entering the entity from a
//! listing.

use dashmap::DashMap;

use crate::fs::path::IrodsPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Unknown,
}

#[derive(Debug, Clone, Copy)]
pub struct StatEntry {
    pub kind: EntryKind,
    pub length: i64,
}

/// Caches `(kind, length)` per canonical path. Any mutation that changes
/// kind or size must invalidate both fields together, never just one.
#[derive(Default)]
pub struct StatCache {
    entries: DashMap<String, StatEntry>,
}

impl StatCache {
    pub fn new() -> Self {
        StatCache { entries: DashMap::new() }
    }

    pub fn get(&self, path: &IrodsPath) -> Option<StatEntry> {
        self.entries.get(&path.absolute()).map(|e| *e)
    }

    pub fn put(&self, path: &IrodsPath, entry: StatEntry) {
        self.entries.insert(path.absolute(), entry);
    }

    /// Invalidates one entity, e.g. after a mutating operation on it.
    pub fn invalidate(&self, path: &IrodsPath) {
        self.entries.remove(&path.absolute());
    }

    /// Invalidates every cached entity; used by an explicit `reset`.
    pub fn reset(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = StatCache::new();
        let path = IrodsPath::new("/z/home/rods/a.txt", "/ignored");
        cache.put(&path, StatEntry { kind: EntryKind::File, length: 42 });
        let entry = cache.get(&path).expect("cached");
        assert_eq!(entry.length, 42);
        assert_eq!(entry.kind, EntryKind::File);
    }

    #[test]
    fn invalidate_drops_both_fields_together() {
        let cache = StatCache::new();
        let path = IrodsPath::new("/z/home/rods/a.txt", "/ignored");
        cache.put(&path, StatEntry { kind: EntryKind::File, length: 42 });
        cache.invalidate(&path);
        assert!(cache.get(&path).is_none());
    }
}
