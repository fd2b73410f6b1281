// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while resolving or instantiating modules
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The whole fallback chain was exhausted without a match
    #[error("Cannot find module '{specifier}' from '{from}'")]
    ModuleNotFound {
        /// Requested specifier
        specifier: String,
        /// Virtual path the request was anchored at
        from: String,
    },

    /// `load_main()` on a scope without a main module
    #[error("No main module registered for {scope}")]
    NoMainModule {
        /// Scope that has no main module
        scope: String,
    },

    /// Type error (wrong value type)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Host loader failure
    #[error("Host error: {0}")]
    Host(String),

    /// File system error
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Error raised by a module body
    #[error(transparent)]
    Factory(#[from] anyhow::Error),
}

impl LoaderError {
    /// Create a module not found error
    pub fn module_not_found(specifier: impl Into<String>, from: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            specifier: specifier.into(),
            from: from.into(),
        }
    }

    /// Create a new TypeError
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a host error
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Whether this is a [`LoaderError::ModuleNotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ModuleNotFound { .. })
    }
}
