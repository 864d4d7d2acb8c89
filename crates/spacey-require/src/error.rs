// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the require() façade

use std::path::PathBuf;
use thiserror::Error;

/// Result type for module loading operations
pub type Result<T> = std::result::Result<T, RequireError>;

/// Errors that can occur while requiring or resolving modules
#[derive(Debug, Error)]
pub enum RequireError {
    /// A `node:` redirect named a built-in that does not exist or is internal
    #[error("No such built-in module: {0}")]
    UnknownBuiltinModule(String),

    /// The requested specifier is not listed in the active redirect map
    #[error("Manifest resource {parent} does not list {specifier} as a dependency specifier")]
    MissingDependency {
        /// Identifier of the requesting module
        parent: String,
        /// The specifier that was requested
        specifier: String,
    },

    /// Wrong argument type passed to a resolution function
    #[error("The \"{name}\" argument must be of type {expected}. Received type {actual}")]
    InvalidArgType {
        /// Argument name
        name: &'static str,
        /// Expected type
        expected: &'static str,
        /// `typeof` of the value actually received
        actual: &'static str,
    },

    /// A redirect target could not be parsed as a URL
    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(#[from] url::ParseError),

    /// A redirect target used a scheme other than `node:` or `file:`
    #[error("Unsupported redirect scheme '{scheme}' in {target}")]
    UnsupportedRedirectScheme {
        /// The URL scheme, without the trailing colon
        scheme: String,
        /// The full redirect target
        target: String,
    },

    /// A `file:` redirect does not denote a local absolute path
    #[error("File URL must name a local path: {0}")]
    InvalidFileUrl(String),

    /// Module not found
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// No handler registered for the file's extension
    #[error("No extension handler for '{0}'")]
    UnknownExtension(PathBuf),

    /// Module source failed to compile or evaluate
    #[error("Error compiling '{path}': {reason}")]
    Compile {
        /// Module filename
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RequireError {
    /// Create a missing dependency error
    pub fn missing_dependency(parent: impl Into<String>, specifier: impl Into<String>) -> Self {
        Self::MissingDependency {
            parent: parent.into(),
            specifier: specifier.into(),
        }
    }

    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }

    /// Node.js-style error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownBuiltinModule(_) => "ERR_UNKNOWN_BUILTIN_MODULE",
            Self::MissingDependency { .. } => "ERR_MANIFEST_DEPENDENCY_MISSING",
            Self::InvalidArgType { .. } => "ERR_INVALID_ARG_TYPE",
            Self::InvalidRedirect(_) => "ERR_INVALID_URL",
            Self::UnsupportedRedirectScheme { .. } => "ERR_UNSUPPORTED_REDIRECT_SCHEME",
            Self::InvalidFileUrl(_) => "ERR_INVALID_FILE_URL_PATH",
            Self::ModuleNotFound(_) => "MODULE_NOT_FOUND",
            Self::UnknownExtension(_) => "ERR_UNKNOWN_FILE_EXTENSION",
            Self::Compile { .. } => "ERR_COMPILE",
            Self::Io(_) => "ERR_FS",
            Self::Json(_) => "ERR_JSON_PARSE",
        }
    }
}
