// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default directory segment that nests dependency scopes.
pub const DEFAULT_NAMESPACE_DIR: &str = "node_modules";

/// Default file name tried when a request addresses a directory.
pub const DEFAULT_INDEX_NAME: &str = "index";

/// Configuration shared by every scope of a loader tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory the root scope's virtual modules live under
    pub root_dir: PathBuf,

    /// Segment placed between a scope and its child scopes
    pub namespace_dir: String,

    /// Entry file name for directory requests
    pub index_name: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            namespace_dir: DEFAULT_NAMESPACE_DIR.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Replace the root directory.
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Root directory as a forward-slash virtual path.
    pub(crate) fn root_path(&self) -> String {
        let root = self.root_dir.to_string_lossy().replace('\\', "/");
        crate::path::normalize(&root)
    }
}
