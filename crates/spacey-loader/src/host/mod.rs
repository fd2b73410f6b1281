// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host collaborator for the terminal fallback
//!
//! A loader tree only consults its host for specifiers that no virtual scope
//! registered: built-in modules, and real installed packages found by the
//! host's own resolution algorithm.

mod resolver;

pub use resolver::FsResolver;

use crate::error::{LoaderError, Result};
use crate::value::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Node.js built-in module names
pub const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Check if a specifier names a built-in module (`node:` prefix allowed)
pub fn is_builtin(specifier: &str) -> bool {
    let name = specifier.strip_prefix("node:").unwrap_or(specifier);
    let name = name.split('/').next().unwrap_or(name);
    BUILTIN_MODULES.contains(&name)
}

/// The host environment's module system.
pub trait HostResolver: Send + Sync {
    /// Whether `specifier` is a host built-in.
    fn is_builtin(&self, specifier: &str) -> bool;

    /// Resolve `specifier` to an absolute path from `basedir`.
    fn resolve(&self, specifier: &str, basedir: &Path) -> Option<PathBuf>;

    /// Load a built-in by name or a resolved absolute path, returning its
    /// exports.
    fn require(&self, id: &str) -> Result<Value>;
}

/// Signature of a host-native module loader.
pub type HostLoadFn = dyn Fn(&str) -> Result<Value> + Send + Sync;

/// The standard host: Node built-ins, on-disk resolution, and a caller
/// supplied loader for everything that has to be executed.
///
/// `.json` files are parsed directly; `.node` addons are rejected.
pub struct NodeHost {
    resolver: FsResolver,
    load: Box<HostLoadFn>,
}

impl NodeHost {
    /// Create a host that executes modules with `load`
    pub fn new<F>(load: F) -> Self
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            resolver: FsResolver::new(),
            load: Box::new(load),
        }
    }

    /// Replace the on-disk resolver
    pub fn with_resolver(mut self, resolver: FsResolver) -> Self {
        self.resolver = resolver;
        self
    }

    fn load_json(&self, path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Ok(Value::from_json(&json))
    }
}

impl HostResolver for NodeHost {
    fn is_builtin(&self, specifier: &str) -> bool {
        is_builtin(specifier)
    }

    fn resolve(&self, specifier: &str, basedir: &Path) -> Option<PathBuf> {
        self.resolver.resolve(specifier, basedir)
    }

    fn require(&self, id: &str) -> Result<Value> {
        let path = Path::new(id);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                debug!(id, "loading json module");
                self.load_json(path)
            }
            Some("node") => Err(LoaderError::host(format!(
                "Native addons (.node) are not supported: {}",
                id
            ))),
            _ => (self.load)(id),
        }
    }
}

/// A host with no built-ins that resolves nothing.
///
/// For fully self-contained bundles: anything unregistered is
/// [`LoaderError::ModuleNotFound`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl HostResolver for NoHost {
    fn is_builtin(&self, _specifier: &str) -> bool {
        false
    }

    fn resolve(&self, _specifier: &str, _basedir: &Path) -> Option<PathBuf> {
        None
    }

    fn require(&self, id: &str) -> Result<Value> {
        Err(LoaderError::host(format!("no host loader for '{}'", id)))
    }
}
