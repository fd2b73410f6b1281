// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Classification of require specifiers

use crate::path;

/// A require specifier, classified once at the `require` boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// `./foo`, `../foo`, `.` or `..`
    Relative(&'a str),
    /// `foo`, `foo/bar`, `@scope/foo/bar`
    Package {
        /// The full specifier as written
        specifier: &'a str,
        /// Package name (two segments for scoped packages)
        name: &'a str,
        /// Path inside the package
        subpath: Option<&'a str>,
    },
}

impl<'a> Request<'a> {
    /// Classify a specifier
    pub fn parse(specifier: &'a str) -> Self {
        if path::is_relative(specifier) {
            return Request::Relative(specifier);
        }
        let (name, subpath) = path::parse_package_specifier(specifier);
        Request::Package {
            specifier,
            name,
            subpath,
        }
    }

    /// The specifier as written
    pub fn specifier(&self) -> &'a str {
        match self {
            Request::Relative(specifier) => specifier,
            Request::Package { specifier, .. } => specifier,
        }
    }
}
