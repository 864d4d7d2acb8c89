// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dependency policy for restricted `require()`
//!
//! A [`RedirectMap`] lists the specifiers a module may require. Each entry
//! either grants the specifier as written or redirects it to a `node:` built-in
//! or a `file:` URL. Anything not listed is a missing dependency, reported
//! through a [`ViolationReaction`].

use crate::error::{RequireError, Result};
use crate::natives::{load_native_module, LoadingMode, NativeModule, NativeRegistry};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// What a redirect map says about one specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Load the specifier as written
    Granted,
    /// Load this `node:` or `file:` URL instead
    Redirect(String),
}

/// Specifier → authorization table, matched exactly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectMap {
    entries: HashMap<String, Authorization>,
}

impl RedirectMap {
    /// Create an empty map, which denies everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `specifier` as written
    pub fn allow(mut self, specifier: impl Into<String>) -> Self {
        self.entries.insert(specifier.into(), Authorization::Granted);
        self
    }

    /// Redirect `specifier` to `target`
    pub fn redirect(mut self, specifier: impl Into<String>, target: impl Into<String>) -> Self {
        self.entries
            .insert(specifier.into(), Authorization::Redirect(target.into()));
        self
    }

    /// Look up a specifier
    pub fn get(&self, specifier: &str) -> Option<&Authorization> {
        self.entries.get(specifier)
    }

    /// Number of declared dependencies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no dependencies are declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Authorization)> for RedirectMap {
    fn from_iter<I: IntoIterator<Item = (K, Authorization)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Which specifiers a require capability may resolve
#[derive(Debug, Clone)]
pub enum Policy {
    /// Everything is allowed
    Unrestricted,
    /// Only what the map declares
    Restricted(Arc<RedirectMap>),
}

impl From<RedirectMap> for Policy {
    fn from(map: RedirectMap) -> Self {
        Policy::Restricted(Arc::new(map))
    }
}

/// Outcome of checking one specifier against a policy
#[derive(Debug, Clone)]
pub enum Decision {
    /// Load the specifier through the module system unchanged
    UseAsGiven,
    /// Use this compiled built-in
    UseNativeTarget(Arc<NativeModule>),
    /// Load this absolute path through the module system
    UseFileTarget(PathBuf),
    /// Not declared in the redirect map
    Denied,
}

impl Policy {
    /// Decide how `specifier` may be loaded.
    ///
    /// `Denied` is returned, not raised; redirect targets that cannot be
    /// honored are errors.
    pub fn decide(
        &self,
        specifier: &str,
        natives: &dyn NativeRegistry,
        mode: LoadingMode,
    ) -> Result<Decision> {
        let map = match self {
            Policy::Unrestricted => return Ok(Decision::UseAsGiven),
            Policy::Restricted(map) => map,
        };

        let target = match map.get(specifier) {
            None => return Ok(Decision::Denied),
            Some(Authorization::Granted) => return Ok(Decision::UseAsGiven),
            Some(Authorization::Redirect(target)) => target,
        };

        let parsed = Url::parse(target)?;
        match parsed.scheme() {
            "node" => {
                let name = parsed.path();
                match load_native_module(natives, name, target, mode) {
                    Some(module) if module.can_be_required_by_users() => {
                        debug!(target: "module", "redirect {} -> built-in {}", specifier, name);
                        Ok(Decision::UseNativeTarget(module))
                    }
                    _ => Err(RequireError::UnknownBuiltinModule(name.to_string())),
                }
            }
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| RequireError::InvalidFileUrl(target.clone()))?;
                debug!(target: "module", "redirect {} -> {}", specifier, path.display());
                Ok(Decision::UseFileTarget(path))
            }
            scheme => Err(RequireError::UnsupportedRedirectScheme {
                scheme: scheme.to_string(),
                target: target.clone(),
            }),
        }
    }
}

type ReactionFn = dyn Fn(RequireError) -> Result<()> + Send + Sync;

/// Called once for every specifier a redirect map does not declare.
///
/// Returning `Err` fails the `require()` call. Returning `Ok(())` lets the
/// call proceed as an unrestricted load.
#[derive(Clone)]
pub struct ViolationReaction(Arc<ReactionFn>);

impl ViolationReaction {
    /// Fail the require call with the missing dependency error
    pub fn throw() -> Self {
        Self(Arc::new(|err: RequireError| -> Result<()> { Err(err) }))
    }

    /// Log the violation and continue loading
    pub fn log() -> Self {
        Self(Arc::new(|err: RequireError| -> Result<()> {
            warn!(code = err.code(), "{}", err);
            Ok(())
        }))
    }

    /// Use a custom callback
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(RequireError) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Report a violation
    pub fn react(&self, err: RequireError) -> Result<()> {
        (self.0)(err)
    }
}

impl fmt::Debug for ViolationReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViolationReaction")
    }
}

/// A policy plus what to do when it is violated
#[derive(Debug, Clone)]
pub struct Redirects {
    /// Which specifiers are allowed
    pub policy: Policy,
    /// Reaction to undeclared specifiers
    pub reaction: ViolationReaction,
}

impl Redirects {
    /// Create redirects from a policy and reaction
    pub fn new(policy: impl Into<Policy>, reaction: ViolationReaction) -> Self {
        Self {
            policy: policy.into(),
            reaction,
        }
    }

    /// Allow everything. The reaction is never invoked.
    pub fn unrestricted() -> Self {
        Self {
            policy: Policy::Unrestricted,
            reaction: ViolationReaction::throw(),
        }
    }
}
