// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Virtual path helpers
//!
//! Virtual paths are POSIX-style, forward-slash delimited and case sensitive.
//! They never carry a trailing slash, and registered module paths have their
//! extension stripped before they are stored or looked up.

/// Normalize a path, collapsing `.`, `..` and empty segments.
///
/// `..` never climbs above the root of an absolute path.
pub fn normalize(path: &str) -> String {
    let is_absolute = path.starts_with('/');
    let mut components: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if !components.is_empty() && components.last() != Some(&"..") {
                    components.pop();
                } else if !is_absolute {
                    components.push("..");
                }
            }
            c => components.push(c),
        }
    }

    let result = components.join("/");

    if is_absolute {
        format!("/{}", result)
    } else if result.is_empty() {
        ".".to_string()
    } else {
        result
    }
}

/// Join two paths and normalize the result.
///
/// Like Node's `path.join`, `path` is always appended to `base`, even when it
/// starts with a slash.
pub fn join(base: &str, path: &str) -> String {
    if base.is_empty() {
        return normalize(path);
    }
    normalize(&format!("{}/{}", base, path))
}

/// Directory portion of a normalized path.
pub fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => path[..pos].to_string(),
        None => ".".to_string(),
    }
}

/// Final segment of a path.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Extension of the final segment, including the leading dot.
///
/// Dotfiles such as `.eslintrc` have no extension.
pub fn extname(path: &str) -> &str {
    let name = basename(path);
    if name == "." || name == ".." {
        return "";
    }
    match name.rfind('.') {
        Some(0) | None => "",
        Some(pos) => &name[pos..],
    }
}

/// Remove the trailing extension, if any.
pub fn strip_extension(path: &str) -> String {
    let ext = extname(path);
    path[..path.len() - ext.len()].to_string()
}

/// Key under which a module path is registered and cached: rooted at `/`,
/// normalized, extension stripped.
pub fn to_module_path(path: &str) -> String {
    strip_extension(&join("/", path))
}

/// Whether a require specifier is relative (`.`, `..`, `./…`, `../…`).
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Split a bare specifier into its package name and optional sub-path.
///
/// Scoped packages (`@scope/name`) keep their first two segments together.
pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let split_at = if specifier.starts_with('@') {
        specifier.find('/').and_then(|scope_end| {
            specifier[scope_end + 1..]
                .find('/')
                .map(|name_end| scope_end + 1 + name_end)
        })
    } else {
        specifier.find('/')
    };

    match split_at {
        Some(pos) => {
            let subpath = &specifier[pos + 1..];
            (&specifier[..pos], (!subpath.is_empty()).then_some(subpath))
        }
        None => (specifier, None),
    }
}
