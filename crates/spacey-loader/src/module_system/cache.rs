// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-scope module cache

use super::record::ModuleRecord;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe module cache keyed by virtual path
pub struct ModuleCache {
    cache: DashMap<String, Arc<ModuleRecord>>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Get a cached module by path
    pub fn get(&self, path: &str) -> Option<Arc<ModuleRecord>> {
        self.cache.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a module is cached
    pub fn contains(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    /// Return the cached record, or insert the one built by `create`.
    ///
    /// The flag is true when this call inserted the record. No shard lock is
    /// held once this returns.
    pub fn get_or_insert_with<F>(&self, path: &str, create: F) -> (Arc<ModuleRecord>, bool)
    where
        F: FnOnce() -> ModuleRecord,
    {
        match self.cache.entry(path.to_string()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let record = Arc::new(create());
                entry.insert(Arc::clone(&record));
                (record, true)
            }
        }
    }

    /// Drop the record for a path
    pub(crate) fn remove(&self, path: &str) -> Option<Arc<ModuleRecord>> {
        self.cache.remove(path).map(|(_, record)| record)
    }

    /// Cached module paths, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.cache.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for ModuleCache {
    fn default() -> Self {
        Self::new()
    }
}
