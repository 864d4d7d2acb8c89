// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration

use crate::error::Result;
use crate::natives::LoadingMode;
use serde::{Deserialize, Serialize};

/// Options shared by the native loader and the reference host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Compile built-ins for the experimental ES module loader
    pub experimental_modules: bool,

    /// Whether the inspector binding is available, which adds `inspector`
    /// to the built-in catalog
    pub inspector: bool,

    /// File extensions probed by the reference host, in order
    pub extensions: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            experimental_modules: false,
            inspector: false,
            extensions: vec![".js".to_string(), ".json".to_string()],
        }
    }
}

impl LoaderOptions {
    /// Parse options from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The loading mode selected by these options
    pub fn loading_mode(&self) -> LoadingMode {
        if self.experimental_modules {
            LoadingMode::Experimental
        } else {
            LoadingMode::Conventional
        }
    }
}
