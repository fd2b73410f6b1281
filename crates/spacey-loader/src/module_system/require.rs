// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `require` handed to every module factory

use super::loader::Loader;
use super::record::ModuleRecord;
use crate::error::Result;
use crate::value::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a specifier resolves to, without loading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A registered virtual module
    Virtual {
        /// Synthesized absolute filename
        filename: String,
    },
    /// A host built-in module
    Builtin(String),
    /// A real file found by the host resolver
    Host(PathBuf),
}

/// A module's private `require`, anchored at the module's own directory.
#[derive(Clone)]
pub struct Require {
    loader: Arc<Loader>,
    dirname: String,
    record: Option<Arc<ModuleRecord>>,
}

impl Require {
    pub(crate) fn new(loader: Arc<Loader>, dirname: String, record: Option<Arc<ModuleRecord>>) -> Self {
        Self {
            loader,
            dirname,
            record,
        }
    }

    /// `require(request)`
    pub fn call(&self, request: &str) -> Result<Value> {
        self.loader
            .require_from(&self.dirname, request, self.record.as_ref())
    }

    /// `require.resolve(request)`: locate without instantiating
    pub fn resolve(&self, request: &str) -> Result<Resolved> {
        self.loader.resolve_from(&self.dirname, request)
    }

    /// Virtual directory requests are anchored at
    pub fn dirname(&self) -> &str {
        &self.dirname
    }

    /// The module this require belongs to
    pub fn record(&self) -> Option<&Arc<ModuleRecord>> {
        self.record.as_ref()
    }

    /// The scope this require resolves in
    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }
}

impl fmt::Debug for Require {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Require")
            .field("scope", &self.loader.display_name())
            .field("dirname", &self.dirname)
            .finish()
    }
}
