// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Virtual CommonJS module system
//!
//! - Scope tree ([`Loader`]) with per-scope factories and caches
//! - `require()` for module bodies ([`Require`])
//! - `module` records ([`ModuleRecord`])

mod cache;
mod loader;
mod record;
mod request;
mod require;

pub use cache::ModuleCache;
pub use loader::{AddOptions, FactoryFn, Loader};
pub use record::ModuleRecord;
pub use request::Request;
pub use require::{Require, Resolved};
