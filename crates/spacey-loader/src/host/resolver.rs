// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! On-disk module path resolution (Node.js algorithm)
//!
//! Only consulted by the terminal fallback, for specifiers that no virtual
//! scope registered.

use crate::path::{is_relative, parse_package_specifier};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Resolver implementing the Node.js file and `node_modules` lookup
#[derive(Debug, Clone)]
pub struct FsResolver {
    /// File extensions to try
    extensions: Vec<String>,
    /// Directory searched for packages
    modules_dir: String,
}

impl FsResolver {
    /// Create a resolver with the default `.js`, `.json`, `.node` extensions
    pub fn new() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".json".to_string(), ".node".to_string()],
            modules_dir: crate::config::DEFAULT_NAMESPACE_DIR.to_string(),
        }
    }

    /// Replace the extension list
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve `specifier` from the directory `basedir`
    pub fn resolve(&self, specifier: &str, basedir: &Path) -> Option<PathBuf> {
        let resolved = if is_relative(specifier) || specifier.starts_with('/') {
            self.resolve_file(&basedir.join(specifier))
        } else {
            self.resolve_node_modules(specifier, basedir)
        };
        trace!(specifier, basedir = %basedir.display(), found = resolved.is_some(), "fs resolve");
        resolved.map(|path| path.canonicalize().unwrap_or(path))
    }

    /// Resolve a file path: exact file, then with extensions, then directory
    fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        let name = path.file_name()?.to_string_lossy().to_string();
        for ext in &self.extensions {
            let with_ext = path.with_file_name(format!("{}{}", name, ext));
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }

        if path.is_dir() {
            return self.resolve_directory(path);
        }

        None
    }

    /// Resolve a directory (package.json main, then index files)
    fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(main) = read_main(dir) {
            let main_path = dir.join(main);
            if main_path.is_file() {
                return Some(main_path);
            }
            for ext in &self.extensions {
                let name = main_path.file_name()?.to_string_lossy().to_string();
                let with_ext = main_path.with_file_name(format!("{}{}", name, ext));
                if with_ext.is_file() {
                    return Some(with_ext);
                }
            }
            if main_path.is_dir() {
                if let Some(index) = self.resolve_index(&main_path) {
                    return Some(index);
                }
            }
        }

        self.resolve_index(dir)
    }

    fn resolve_index(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index{}", ext)))
            .find(|index| index.is_file())
    }

    /// Walk up from `basedir` looking for the package in `node_modules`
    fn resolve_node_modules(&self, specifier: &str, basedir: &Path) -> Option<PathBuf> {
        let (package_name, subpath) = parse_package_specifier(specifier);

        let mut current = Some(basedir);
        while let Some(dir) = current {
            current = dir.parent();

            // node_modules/node_modules is never searched
            if dir.file_name().is_some_and(|name| name == self.modules_dir.as_str()) {
                continue;
            }

            let package_dir = dir.join(&self.modules_dir).join(package_name);
            if !package_dir.exists() {
                continue;
            }

            let found = match subpath {
                Some(sub) => self.resolve_file(&package_dir.join(sub)),
                None => self.resolve_directory(&package_dir),
            };
            if found.is_some() {
                return found;
            }
        }

        None
    }
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal package.json structure for resolution
#[derive(Debug, Deserialize)]
struct PackageJson {
    main: Option<String>,
}

/// `main` of a directory's package.json; unreadable manifests are ignored.
fn read_main(dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let pkg: PackageJson = serde_json::from_str(&content).ok()?;
    pkg.main
}
