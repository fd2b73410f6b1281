// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Instantiated module records (`module` inside a factory)

use crate::value::{Object, Value};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// An instantiated module.
///
/// Created with an empty exports object and `loaded == false` right before its
/// factory runs.
pub struct ModuleRecord {
    /// Virtual path the record is cached under
    path: String,
    /// Synthesized absolute filename (also the module id)
    filename: String,
    /// Synthesized absolute directory
    dirname: String,
    exports: RwLock<Value>,
    loaded: AtomicBool,
    parent: Option<Weak<ModuleRecord>>,
    children: RwLock<Vec<Arc<ModuleRecord>>>,
}

impl ModuleRecord {
    pub(crate) fn new(
        path: String,
        filename: String,
        dirname: String,
        exports: Object,
        parent: Option<&Arc<ModuleRecord>>,
    ) -> Self {
        Self {
            path,
            filename,
            dirname,
            exports: RwLock::new(Value::Object(exports)),
            loaded: false.into(),
            parent: parent.map(Arc::downgrade),
            children: RwLock::new(Vec::new()),
        }
    }

    /// Module id; identical to the filename.
    pub fn id(&self) -> &str {
        &self.filename
    }

    /// Synthesized absolute filename
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Synthesized absolute directory
    pub fn dirname(&self) -> &str {
        &self.dirname
    }

    /// Scope-relative virtual path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current `module.exports`
    pub fn exports(&self) -> Value {
        self.exports.read().clone()
    }

    /// Replace `module.exports`.
    pub fn set_exports(&self, value: impl Into<Value>) {
        *self.exports.write() = value.into();
    }

    /// Whether the factory has finished running
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    /// The module that first required this one, if it is still alive
    pub fn parent(&self) -> Option<Arc<ModuleRecord>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Modules first loaded by this one, in load order
    pub fn children(&self) -> Vec<Arc<ModuleRecord>> {
        self.children.read().clone()
    }

    pub(crate) fn add_child(&self, child: Arc<ModuleRecord>) {
        self.children.write().push(child);
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("filename", &self.filename)
            .field("loaded", &self.is_loaded())
            .field("children", &self.children.read().len())
            .finish()
    }
}
