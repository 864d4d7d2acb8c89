// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-require
//!
//! Policy-gated `require()` for the Spacey runtime.
//!
//! This crate provides:
//!
//! - A `require()` capability bound to a module, with `resolve`,
//!   `resolve.paths`, `main`, `extensions` and `cache`
//! - Dependency policies: redirect maps that grant specifiers, redirect
//!   them to `node:` built-ins or `file:` URLs, or report them as missing
//! - Lazy, overridable globals for every built-in module
//! - A filesystem-backed module system for hosts without their own
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spacey_require::policy::{RedirectMap, Redirects, ViolationReaction};
//! use spacey_require::{make_require_function, FsModuleSystem, LoaderOptions};
//!
//! let system = FsModuleSystem::new(natives, &LoaderOptions::default(), compiler);
//! let main = system.set_main_module("/app/index.js");
//!
//! let policy = RedirectMap::new()
//!     .allow("./util")
//!     .redirect("fs", "node:fs");
//! let require = make_require_function(main, Some(Redirects::new(policy, ViolationReaction::throw())));
//!
//! let fs = require.call("fs")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod globals;
pub mod module_system;
pub mod natives;
pub mod policy;
pub mod value;

// Re-exports
pub use config::LoaderOptions;
pub use error::{RequireError, Result};
pub use globals::add_builtin_libs_to_object;
pub use module_system::{make_require_function, FsModuleSystem, ModuleContext, ModuleSystem, Require};
pub use natives::{builtin_libs, BuiltinCatalog, LoadingMode};
pub use value::{JsObject, Value};

/// Version of the spacey-require crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
