// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The shared module registry

use super::cache::{CompiledModule, ProgramCache};
use super::loader::{self, SourceLoader};
use super::native::NativeModule;
use super::path;
use super::resolver::ModuleResolver;
use super::sourcemap;
use crate::error::Result;
use parking_lot::RwLock;
use spacey_script::{Program, Runtime};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// State shared by every runtime a registry enables: native modules,
/// compiled programs, the source loader and the global search folders.
///
/// Cloning is cheap and clones share everything. A `Registry` is
/// `Send + Sync`; each runtime gets its own [`ModuleResolver`] from
/// [`Registry::enable`].
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    natives: RwLock<BTreeMap<String, Arc<dyn NativeModule>>>,
    programs: ProgramCache,
    loader: SourceLoader,
    global_folders: Vec<String>,
}

impl Registry {
    /// A registry reading sources from the filesystem, with no global
    /// folders.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A registry reading sources through `loader`.
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self::builder().loader(loader).build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registers a native module under `name`. Names are cleaned like
    /// paths; registering the same name again replaces the module for
    /// runtimes enabled afterwards.
    pub fn register_native_module<M>(&self, name: &str, module: M)
    where
        M: NativeModule + 'static,
    {
        let name = path::clean(name);
        debug!(module = %name, "registering native module");
        self.inner.natives.write().insert(name, Arc::new(module));
    }

    pub(crate) fn native(&self, name: &str) -> Option<Arc<dyn NativeModule>> {
        self.inner.natives.read().get(name).cloned()
    }

    /// Global search folders, in probe order.
    pub fn global_folders(&self) -> &[String] {
        &self.inner.global_folders
    }

    /// Reads a path through the configured loader.
    pub fn source(&self, path: &str) -> Result<Vec<u8>> {
        (self.inner.loader)(path)
    }

    /// The compiled form of the module at `path`, loading and compiling it
    /// on first use. Each path is compiled at most once per registry, even
    /// when several threads ask for it at the same time.
    pub fn compiled_program(&self, path: &str) -> Result<Arc<CompiledModule>> {
        self.inner.programs.get_or_compile(path, || self.compile(path))
    }

    /// Number of distinct paths compiled so far.
    pub fn compiled_count(&self) -> usize {
        self.inner.programs.len()
    }

    fn compile(&self, module_path: &str) -> Result<CompiledModule> {
        let bytes = self.source(module_path)?;
        let source = String::from_utf8_lossy(&bytes);

        let source_map = sourcemap::find_url(&source).and_then(|url| {
            match sourcemap::load(url, module_path, &self.inner.loader) {
                Ok(map) => Some(map),
                Err(err) => {
                    warn!(path = module_path, url, error = %err, "ignoring source map");
                    None
                }
            }
        });

        let wrapped = loader::wrap_module(module_path, &source)?;
        let program = Program::compile(module_path, &wrapped)?;
        debug!(path = module_path, source_map = source_map.is_some(), "compiled module");
        Ok(CompiledModule::new(program, source_map))
    }

    /// Prepares `runtime` for CommonJS: installs a global `require` backed
    /// by a fresh [`ModuleResolver`], then enables every registered native
    /// module in name order.
    pub fn enable(&self, runtime: &mut Runtime) -> Result<ModuleResolver> {
        let resolver = ModuleResolver::new(self.clone());
        resolver.install(runtime);

        // Snapshot so a module enabling others cannot deadlock on the table
        let natives: Vec<(String, Arc<dyn NativeModule>)> = self
            .inner
            .natives
            .read()
            .iter()
            .map(|(name, module)| (name.clone(), Arc::clone(module)))
            .collect();
        for (name, module) in natives {
            debug!(module = %name, "enabling native module");
            module.enable(runtime)?;
        }
        Ok(resolver)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("natives", &self.inner.natives.read().keys().collect::<Vec<_>>())
            .field("compiled", &self.inner.programs.len())
            .field("global_folders", &self.inner.global_folders)
            .finish()
    }
}

/// Configures a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    loader: Option<SourceLoader>,
    global_folders: Vec<String>,
}

impl RegistryBuilder {
    /// Replaces the filesystem loader.
    pub fn loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Appends folders searched for packages before any `node_modules`
    /// directory.
    pub fn global_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_folders.extend(folders.into_iter().map(Into::into));
        self
    }

    /// Appends the entries of `$NODE_PATH`.
    pub fn node_path_from_env(self) -> Self {
        match std::env::var_os("NODE_PATH") {
            Some(value) => self.node_path(&value),
            None => self,
        }
    }

    /// Appends the entries of a `NODE_PATH`-style list, split with the host's
    /// path separator. Empty entries are skipped.
    pub fn node_path(mut self, value: &OsStr) -> Self {
        self.global_folders.extend(
            std::env::split_paths(value)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| path::from_host(&p)),
        );
        self
    }

    /// Appends `$HOME/.node_modules` and `$HOME/.node_libraries`.
    pub fn home_folders(mut self) -> Self {
        if let Some(home) = dirs::home_dir() {
            self.global_folders.push(path::from_host(&home.join(".node_modules")));
            self.global_folders.push(path::from_host(&home.join(".node_libraries")));
        }
        self
    }

    pub fn build(self) -> Registry {
        let loader: SourceLoader = match self.loader {
            Some(loader) => loader,
            None => Arc::new(loader::default_source_loader),
        };
        Registry {
            inner: Arc::new(RegistryInner {
                natives: RwLock::new(BTreeMap::new()),
                programs: ProgramCache::new(),
                loader,
                global_folders: self.global_folders,
            }),
        }
    }
}
