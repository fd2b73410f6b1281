// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-loader
//!
//! An in-memory, scoped CommonJS module loader for bundled applications.
//!
//! Build tooling registers module bodies ("factories") under virtual paths,
//! one [`Loader`] scope per dependency, and the runtime then `require`s them
//! the way Node.js would:
//!
//! - relative requests (`./lib/util`, with `lib/util/index` as fallback)
//! - bare package requests (`left-pad`, `@babel/core/lib/parse`)
//! - nested dependency isolation (`a` and `a/node_modules/b` may both hold `/lib`)
//! - a fallback to the host's own resolver for anything not registered
//!
//! ## Quick Start
//!
//! ```rust
//! use spacey_loader::{AddOptions, Loader, Value};
//!
//! # fn main() -> spacey_loader::Result<()> {
//! let root = Loader::new();
//!
//! root.scope("greeting", "1.0.0", |pkg| {
//!     pkg.add_main("/index.js", |module, _exports, _require, _filename, _dirname| {
//!         module.set_exports("hello");
//!         Ok(())
//!     });
//! });
//!
//! root.add("/app.js", AddOptions::main(), |_module, exports, require, _filename, _dirname| {
//!     let greeting = require.call("greeting")?;
//!     exports.set("message", format!("{}, world", greeting));
//!     Ok(())
//! });
//!
//! let app = root.load_main()?;
//! assert_eq!(app.get("message"), Value::from("hello, world"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod host;
pub mod module_system;
pub mod path;
pub mod value;

// Re-exports
pub use config::LoaderConfig;
pub use error::{LoaderError, Result};
pub use host::{HostResolver, NoHost, NodeHost, FsResolver, BUILTIN_MODULES};
pub use module_system::{AddOptions, FactoryFn, Loader, ModuleCache, ModuleRecord, Require, Resolved};
pub use value::{Function, Object, Value};

/// Version of spacey-loader
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
