// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Small helpers shared by the CommonJS loader

use crate::error::{RequireError, Result};
use crate::value::Value;
use std::path::Path;
use url::Url;

/// Remove a leading byte order mark.
///
/// UTF-8 files starting with EF BB BF decode to U+FEFF.
pub fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{FEFF}').unwrap_or(content)
}

/// Turn a referrer into a URL string: absolute paths become `file:` URLs,
/// anything else must already be a URL.
pub fn normalize_referrer_url(referrer: &str) -> Result<String> {
    if Path::new(referrer).is_absolute() {
        let url = Url::from_file_path(referrer)
            .map_err(|_| RequireError::InvalidFileUrl(referrer.to_string()))?;
        return Ok(url.to_string());
    }
    Ok(Url::parse(referrer)?.to_string())
}

/// Require a string argument
pub fn validate_string<'a>(value: &'a Value, name: &'static str) -> Result<&'a str> {
    value.as_str().ok_or(RequireError::InvalidArgType {
        name,
        expected: "string",
        actual: value.type_of(),
    })
}
