// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS module system
//!
//! - [`make_require_function`] builds the `require()` handed to a module,
//!   optionally gated by a [`Redirects`](crate::policy::Redirects) policy
//! - [`ModuleSystem`] is the seam to whatever loads and caches modules
//! - [`FsModuleSystem`] is a filesystem-backed implementation of it

mod cache;
mod context;
mod extensions;
pub mod helpers;
mod loader;
mod require;
mod resolver;

pub use cache::{CachedModule, ModuleCache};
pub use context::{ModuleContext, ModuleSystem, ResolveOptions};
pub use extensions::{ExtensionHandler, ExtensionRegistry};
pub use helpers::{normalize_referrer_url, strip_bom};
pub use loader::{FsModuleSystem, SourceCompiler};
pub use require::{make_require_function, Require};
pub use resolver::ModuleResolver;
