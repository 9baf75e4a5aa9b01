// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module caches
//!
//! Two levels of caching back `require()`:
//!
//! - [`ProgramCache`] lives in the [`Registry`](super::Registry) and is
//!   shared by every runtime. It maps a module path to its compiled
//!   [`Program`], so each file is read and parsed at most once.
//! - [`ModuleCache`] lives in a [`ModuleResolver`](super::ModuleResolver)
//!   and maps keys to the module objects of a single runtime.

use super::sourcemap::SourceMap;
use crate::error::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use spacey_script::Program;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::trace;

use super::resolver::Module;

/// A module source compiled into its function wrapper.
#[derive(Debug)]
pub struct CompiledModule {
    program: Program,
    source_map: Option<SourceMap>,
}

impl CompiledModule {
    pub(crate) fn new(program: Program, source_map: Option<SourceMap>) -> Self {
        Self { program, source_map }
    }

    /// The compiled `(function(exports, require, module) { ... })`.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The source map referenced by the module, if it loaded.
    pub fn source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }
}

/// Thread-safe cache of compiled modules
pub struct ProgramCache {
    /// Cache mapping module paths to compiled programs
    cache: DashMap<String, Arc<CompiledModule>>,
}

impl ProgramCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Get a compiled module by path
    pub fn get(&self, path: &str) -> Option<Arc<CompiledModule>> {
        self.cache.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the cached module, compiling it with `compile` on a miss.
    ///
    /// The entry stays locked while `compile` runs, so concurrent callers
    /// asking for the same path wait for the first one instead of compiling
    /// again. Failures are not cached. `compile` must not re-enter this cache:
    /// other paths may share the locked shard.
    pub fn get_or_compile<F>(&self, path: &str, compile: F) -> Result<Arc<CompiledModule>>
    where
        F: FnOnce() -> Result<CompiledModule>,
    {
        if let Some(compiled) = self.get(path) {
            trace!(path, "program cache hit");
            return Ok(compiled);
        }

        match self.cache.entry(path.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let compiled = Arc::new(compile()?);
                entry.insert(Arc::clone(&compiled));
                Ok(compiled)
            }
        }
    }

    /// Check if a path has been compiled
    pub fn has(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    /// Get all compiled module paths
    pub fn keys(&self) -> Vec<String> {
        self.cache.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get the number of compiled modules
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Key of the cache holding modules found without a file specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum BareKey {
    /// A native module, by cleaned name
    Native(String),
    /// A package search, by specifier joined onto the search start
    Search(String),
}

/// Per-runtime module objects. Not thread-safe; a resolver and its
/// caches belong to one runtime.
pub(crate) struct ModuleCache<K> {
    entries: RefCell<HashMap<K, Module>>,
}

impl<K: Eq + Hash> ModuleCache<K> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<Module> {
        self.entries.borrow().get(key).cloned()
    }

    pub(crate) fn set(&self, key: K, module: Module) {
        self.entries.borrow_mut().insert(key, module);
    }

    pub(crate) fn delete(&self, key: &K) -> Option<Module> {
        self.entries.borrow_mut().remove(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequireError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn compile(path: &str) -> Result<CompiledModule> {
        Ok(CompiledModule::new(Program::compile(path, "(function(){})")?, None))
    }

    #[test]
    fn test_compiles_once() {
        let cache = ProgramCache::new();
        let calls = AtomicUsize::new(0);
        let first = cache
            .get_or_compile("/a.js", || {
                calls.fetch_add(1, Ordering::SeqCst);
                compile("/a.js")
            })
            .unwrap();
        let second = cache
            .get_or_compile("/a.js", || {
                calls.fetch_add(1, Ordering::SeqCst);
                compile("/a.js")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.keys(), vec!["/a.js".to_string()]);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = ProgramCache::new();
        let err = cache
            .get_or_compile("/missing.js", || Err(RequireError::ModuleNotExist))
            .unwrap_err();
        assert!(err.is_not_exist());
        assert!(!cache.has("/missing.js"));
        assert!(cache.is_empty());

        cache.get_or_compile("/missing.js", || compile("/missing.js")).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_compile_of_same_path() {
        let cache = Arc::new(ProgramCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache
                        .get_or_compile("/shared.js", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            compile("/shared.js")
                        })
                        .map(|_| ())
                        .is_ok()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
