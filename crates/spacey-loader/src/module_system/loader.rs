// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scoped virtual module loader
//!
//! A [`Loader`] is one node of a scope tree. The root stands for the
//! application; every child stands for one dependency and lives under
//! `<parent base>/node_modules/<name>`, so two versions of the same package can
//! coexist in different subtrees.
//!
//! Resolution of a request goes, in order:
//!
//! 1. relative requests: the registered `path`, then `path/index`
//! 2. bare requests: a child scope of that package name
//! 3. host built-ins
//! 4. the parent scope, anchored at this scope's directory
//! 5. the host resolver (root only)

use super::cache::ModuleCache;
use super::record::ModuleRecord;
use super::request::Request;
use super::require::{Require, Resolved};
use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::host::{HostResolver, NoHost};
use crate::path;
use crate::value::{Object, Value};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// A module body: `(module, exports, require, __filename, __dirname)`.
pub type FactoryFn =
    dyn Fn(&Arc<ModuleRecord>, &Object, &Require, &str, &str) -> Result<()> + Send + Sync;

/// Options for [`Loader::add`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Register the module as the scope's main module
    pub main: bool,
}

impl AddOptions {
    /// Options marking the main module
    pub fn main() -> Self {
        Self { main: true }
    }
}

/// Where a request ended up, before anything is instantiated.
enum Target {
    Virtual { loader: Arc<Loader>, path: String },
    Builtin(String),
    Host(PathBuf),
}

impl From<Target> for Resolved {
    fn from(target: Target) -> Self {
        match target {
            Target::Virtual { loader, path } => Resolved::Virtual {
                filename: path::join(&loader.base_path, &path),
            },
            Target::Builtin(name) => Resolved::Builtin(name),
            Target::Host(path) => Resolved::Host(path),
        }
    }
}

/// One scope of the virtual module tree
pub struct Loader {
    config: Arc<LoaderConfig>,
    host: Arc<dyn HostResolver>,
    /// Absolute-style directory this scope's modules live under
    base_path: String,
    /// This scope's directory relative to its parent's base path
    mount: String,
    name: Option<String>,
    version: Option<String>,
    parent: Option<Weak<Loader>>,
    children: RwLock<BTreeMap<String, Arc<Loader>>>,
    factories: DashMap<String, Arc<FactoryFn>>,
    cache: ModuleCache,
    main: RwLock<Option<String>>,
}

impl Loader {
    /// Create a root loader with the default configuration and no host
    pub fn new() -> Arc<Self> {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a root loader with no host
    pub fn with_config(config: LoaderConfig) -> Arc<Self> {
        Self::with_host(config, Arc::new(NoHost))
    }

    /// Create a root loader backed by `host` for the terminal fallback
    pub fn with_host(config: LoaderConfig, host: Arc<dyn HostResolver>) -> Arc<Self> {
        let base_path = config.root_path();
        Arc::new(Self {
            config: Arc::new(config),
            host,
            base_path,
            mount: "/".to_string(),
            name: None,
            version: None,
            parent: None,
            children: RwLock::new(BTreeMap::new()),
            factories: DashMap::new(),
            cache: ModuleCache::new(),
            main: RwLock::new(None),
        })
    }

    /// Create a child scope for dependency `name` and hand it to `setup`.
    ///
    /// An existing child with the same name is replaced.
    pub fn scope<F>(self: &Arc<Self>, name: impl Into<String>, version: impl Into<String>, setup: F)
    where
        F: FnOnce(&Arc<Loader>),
    {
        let name = name.into();
        let mount = format!("/{}/{}", self.config.namespace_dir, name);
        let child = Arc::new(Self {
            config: Arc::clone(&self.config),
            host: Arc::clone(&self.host),
            base_path: path::join(&self.base_path, &mount),
            mount,
            name: Some(name.clone()),
            version: Some(version.into()),
            parent: Some(Arc::downgrade(self)),
            children: RwLock::new(BTreeMap::new()),
            factories: DashMap::new(),
            cache: ModuleCache::new(),
            main: RwLock::new(None),
        });
        debug!(scope = %child.display_name(), base_path = %child.base_path, "created scope");

        let replaced = self.children.write().insert(name, Arc::clone(&child));
        if let Some(previous) = replaced {
            debug!(scope = %previous.display_name(), "replaced existing scope");
        }

        setup(&child);
    }

    /// Register a module body under `path`.
    ///
    /// The path is normalized and its extension stripped. Re-registering a
    /// path replaces the factory and discards any instance cached for it.
    pub fn add<F>(&self, path: &str, options: AddOptions, factory: F)
    where
        F: Fn(&Arc<ModuleRecord>, &Object, &Require, &str, &str) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        let key = path::to_module_path(path);
        debug!(scope = %self.display_name(), path = %key, main = options.main, "registered module");

        self.factories.insert(key.clone(), Arc::new(factory));
        if self.cache.remove(&key).is_some() {
            debug!(path = %key, "discarded cached instance");
        }
        if options.main {
            *self.main.write() = Some(key);
        }
    }

    /// Register the scope's main module
    pub fn add_main<F>(&self, path: &str, factory: F)
    where
        F: Fn(&Arc<ModuleRecord>, &Object, &Require, &str, &str) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.add(path, AddOptions::main(), factory);
    }

    /// Load a module as if required from the scope root.
    ///
    /// Absolute-looking paths are taken relative to the scope.
    pub fn load(self: &Arc<Self>, path: &str) -> Result<Value> {
        let relative = path::join(".", path);
        let target = self.locate_relative("/", &relative)?;
        self.load_target(target, None)
    }

    /// [`Loader::load`] followed by a typed conversion
    pub fn load_as<T>(self: &Arc<Self>, path: &str) -> Result<T>
    where
        T: TryFrom<Value, Error = LoaderError>,
    {
        T::try_from(self.load(path)?)
    }

    /// Load the scope's main module
    pub fn load_main(self: &Arc<Self>) -> Result<Value> {
        let main = self.main_path()?;
        self.load(&main)
    }

    /// Resolve `request` as the module living in directory `from` would
    pub fn load_from(self: &Arc<Self>, from: &str, request: &str) -> Result<Value> {
        self.require_from(from, request, None)
    }

    pub(crate) fn require_from(
        self: &Arc<Self>,
        from: &str,
        request: &str,
        requirer: Option<&Arc<ModuleRecord>>,
    ) -> Result<Value> {
        let target = self.locate(from, request)?;
        self.load_target(target, requirer)
    }

    pub(crate) fn resolve_from(self: &Arc<Self>, from: &str, request: &str) -> Result<Resolved> {
        self.locate(from, request).map(Resolved::from)
    }

    fn locate(self: &Arc<Self>, from: &str, request: &str) -> Result<Target> {
        match Request::parse(request) {
            Request::Relative(specifier) => self.locate_relative(from, specifier),
            Request::Package {
                specifier,
                name,
                subpath,
            } => self.locate_package(specifier, name, subpath),
        }
    }

    fn locate_relative(self: &Arc<Self>, from: &str, request: &str) -> Result<Target> {
        let candidate = path::strip_extension(&path::join(from, request));
        let index = path::join(&candidate, &self.config.index_name);

        for variant in [candidate, index] {
            trace!(scope = %self.display_name(), variant = %variant, "trying variant");
            if self.factories.contains_key(&variant) {
                return Ok(Target::Virtual {
                    loader: Arc::clone(self),
                    path: variant,
                });
            }
        }

        // Package sub-paths arrive without a leading `./`
        let request = if path::is_relative(request) {
            request.to_string()
        } else {
            format!("./{}", request.trim_start_matches('/'))
        };
        self.locate_fallback(Some(from), &request)
    }

    fn locate_package(
        self: &Arc<Self>,
        specifier: &str,
        name: &str,
        subpath: Option<&str>,
    ) -> Result<Target> {
        let child = self.children.read().get(name).cloned();
        match (child, subpath) {
            (Some(child), None) => {
                let main = child.main_path()?;
                child.locate_relative("/", &main)
            }
            (Some(child), Some(subpath)) => child.locate_relative("/", subpath),
            (None, _) => self.locate_fallback(None, specifier),
        }
    }

    fn locate_fallback(self: &Arc<Self>, anchor: Option<&str>, request: &str) -> Result<Target> {
        if self.host.is_builtin(request) {
            debug!(request, "resolved to host built-in");
            return Ok(Target::Builtin(request.to_string()));
        }

        let local = anchor.unwrap_or("/");

        if let Some(parent) = &self.parent {
            let anchor = path::join(&self.mount, local);
            let Some(parent) = parent.upgrade() else {
                return Err(LoaderError::module_not_found(request, anchor));
            };
            debug!(
                scope = %self.display_name(),
                request,
                anchor = %anchor,
                "escalating to parent scope"
            );
            return parent.locate(&anchor, request);
        }

        let basedir = PathBuf::from(path::join(&self.base_path, local));
        match self.host.resolve(request, &basedir) {
            Some(resolved) => {
                debug!(request, resolved = %resolved.display(), "resolved by host");
                Ok(Target::Host(resolved))
            }
            None => Err(LoaderError::module_not_found(request, local)),
        }
    }

    fn load_target(&self, target: Target, requirer: Option<&Arc<ModuleRecord>>) -> Result<Value> {
        match target {
            Target::Virtual { loader, path } => loader.instantiate(&path, requirer),
            Target::Builtin(name) => self.host.require(&name),
            Target::Host(path) => self.host.require(&path.to_string_lossy()),
        }
    }

    /// Return the cached exports for `path`, running its factory first if
    /// this is the first request.
    fn instantiate(
        self: &Arc<Self>,
        path: &str,
        requirer: Option<&Arc<ModuleRecord>>,
    ) -> Result<Value> {
        if let Some(record) = self.cache.get(path) {
            trace!(path, loaded = record.is_loaded(), "cache hit");
            return Ok(record.exports());
        }

        let factory = self
            .factories
            .get(path)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LoaderError::module_not_found(path, "/"))?;

        let dirname = path::dirname(path);
        let exports = Object::new();

        // Cached before the factory runs: a cyclic require gets the partial
        // exports instead of a second instance.
        let (record, created) = self.cache.get_or_insert_with(path, || {
            ModuleRecord::new(
                path.to_string(),
                path::join(&self.base_path, path),
                path::join(&self.base_path, &dirname),
                exports.clone(),
                requirer,
            )
        });
        if !created {
            return Ok(record.exports());
        }

        debug!(filename = record.filename(), "instantiating module");
        let require = Require::new(Arc::clone(self), dirname, Some(Arc::clone(&record)));
        factory(&record, &exports, &require, record.filename(), record.dirname())?;

        record.mark_loaded();
        if let Some(parent) = requirer {
            parent.add_child(Arc::clone(&record));
        }

        Ok(record.exports())
    }

    fn main_path(&self) -> Result<String> {
        self.main
            .read()
            .clone()
            .ok_or_else(|| LoaderError::NoMainModule {
                scope: self.display_name(),
            })
    }

    /// `name@version`, or `<root>`
    pub fn display_name(&self) -> String {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => format!("{}@{}", name, version),
            (Some(name), None) => name.clone(),
            _ => "<root>".to_string(),
        }
    }

    /// Dependency name (`None` for the root)
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Dependency version (`None` for the root)
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Directory this scope's modules live under
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Registered main module path
    pub fn main(&self) -> Option<String> {
        self.main.read().clone()
    }

    /// Parent scope, if this is not the root
    pub fn parent(&self) -> Option<Arc<Loader>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Child scope registered under `name`
    pub fn child(&self, name: &str) -> Option<Arc<Loader>> {
        self.children.read().get(name).cloned()
    }

    /// Names of the child scopes, sorted
    pub fn child_names(&self) -> Vec<String> {
        self.children.read().keys().cloned().collect()
    }

    /// Whether a factory is registered for `path`
    pub fn is_registered(&self, path: &str) -> bool {
        self.factories.contains_key(&path::to_module_path(path))
    }

    /// Registered module paths, sorted
    pub fn modules(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.factories.iter().map(|entry| entry.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Instantiated modules of this scope
    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Shared configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("scope", &self.display_name())
            .field("base_path", &self.base_path)
            .field("modules", &self.factories.len())
            .field("children", &self.child_names())
            .finish()
    }
}
