// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm)

use crate::error::{RequireError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolves file and package requests to absolute filenames
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// File extensions to try, in order
    extensions: Vec<String>,
}

impl ModuleResolver {
    /// Create a resolver probing the given extensions
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Whether `request` is relative to the requesting module
    pub fn is_relative(request: &str) -> bool {
        request == "."
            || request == ".."
            || request.starts_with("./")
            || request.starts_with("../")
    }

    /// Whether `request` is an absolute path
    pub fn is_absolute(request: &str) -> bool {
        Path::new(request).is_absolute()
    }

    /// Resolve a request made from a module in `base_dir`.
    ///
    /// Bare requests search `search_paths` when given, otherwise the
    /// `node_modules` chain above `base_dir`.
    pub fn resolve(
        &self,
        request: &str,
        base_dir: &Path,
        search_paths: Option<&[PathBuf]>,
    ) -> Result<PathBuf> {
        if Self::is_relative(request) || Self::is_absolute(request) {
            return match search_paths {
                Some(paths) => paths
                    .iter()
                    .find_map(|dir| self.resolve_file(&dir.join(request)))
                    .ok_or_else(|| RequireError::module_not_found(request)),
                None => self
                    .resolve_file(&base_dir.join(request))
                    .ok_or_else(|| RequireError::module_not_found(request)),
            };
        }

        let lookup: Vec<PathBuf> = match search_paths {
            Some(paths) => paths
                .iter()
                .flat_map(|dir| Self::node_module_paths(dir))
                .collect(),
            None => Self::node_module_paths(base_dir),
        };
        self.resolve_node_modules(request, &lookup)
    }

    /// Resolve a file path: exact, with extensions, then as a directory
    fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(canonical(path));
        }

        for ext in &self.extensions {
            let mut with_ext = path.as_os_str().to_owned();
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Some(canonical(&with_ext));
            }
        }

        if path.is_dir() {
            return self.resolve_directory(path);
        }

        None
    }

    /// Resolve a directory (package.json main, then index files)
    fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(main) = read_package_main(dir) {
            let main_path = dir.join(main);
            if main_path.is_file() {
                return Some(canonical(&main_path));
            }
            for ext in &self.extensions {
                let mut with_ext = main_path.as_os_str().to_owned();
                with_ext.push(ext);
                let with_ext = PathBuf::from(with_ext);
                if with_ext.is_file() {
                    return Some(canonical(&with_ext));
                }
            }
        }

        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index{}", ext)))
            .find(|index| index.is_file())
            .map(|index| canonical(&index))
    }

    /// Resolve a package request against `node_modules` directories
    fn resolve_node_modules(&self, request: &str, lookup: &[PathBuf]) -> Result<PathBuf> {
        let (package_name, subpath) = Self::parse_package_specifier(request);

        for node_modules in lookup {
            let package_dir = node_modules.join(package_name);
            if !package_dir.exists() {
                continue;
            }
            let found = match subpath {
                Some(sub) => self.resolve_file(&package_dir.join(sub)),
                None => self.resolve_directory(&package_dir),
            };
            if let Some(path) = found {
                return Ok(path);
            }
        }

        Err(RequireError::module_not_found(request))
    }

    /// `node_modules` directories from `dir` up to the root, nearest first.
    /// Existing `node_modules` segments are not nested again.
    pub fn node_module_paths(dir: &Path) -> Vec<PathBuf> {
        dir.ancestors()
            .filter(|ancestor| ancestor.file_name().is_none_or(|name| name != "node_modules"))
            .map(|ancestor| ancestor.join("node_modules"))
            .collect()
    }

    /// Split a package specifier into name and optional subpath
    pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
        if let Some(rest) = specifier.strip_prefix('@') {
            // Scoped package: @scope/name or @scope/name/subpath
            if let Some(slash_pos) = rest.find('/') {
                let after_scope = &rest[slash_pos + 1..];
                if let Some(subpath_pos) = after_scope.find('/') {
                    let name_end = 1 + slash_pos + 1 + subpath_pos;
                    return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
                }
            }
            (specifier, None)
        } else if let Some(slash_pos) = specifier.find('/') {
            (&specifier[..slash_pos], Some(&specifier[slash_pos + 1..]))
        } else {
            (specifier, None)
        }
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new(vec![".js".to_string(), ".json".to_string()])
    }
}

/// Minimal package.json structure for resolution
#[derive(Debug, Deserialize)]
struct PackageJson {
    main: Option<String>,
}

fn read_package_main(dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
    serde_json::from_str::<PackageJson>(&content).ok()?.main
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(ModuleResolver::parse_package_specifier("lodash"), ("lodash", None));
        assert_eq!(
            ModuleResolver::parse_package_specifier("lodash/get"),
            ("lodash", Some("get"))
        );
        assert_eq!(
            ModuleResolver::parse_package_specifier("@types/node"),
            ("@types/node", None)
        );
        assert_eq!(
            ModuleResolver::parse_package_specifier("@babel/core/lib/index"),
            ("@babel/core", Some("lib/index"))
        );
    }

    #[test]
    fn test_node_module_paths() {
        let paths = ModuleResolver::node_module_paths(Path::new("/app/node_modules/pkg/lib"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/app/node_modules/pkg/lib/node_modules"),
                PathBuf::from("/app/node_modules/pkg/node_modules"),
                PathBuf::from("/app/node_modules"),
                PathBuf::from("/node_modules"),
            ]
        );
    }

    #[test]
    fn test_resolve_files_and_packages() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("a.js"), "").unwrap();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/index.json"), "{}").unwrap();
        fs::create_dir_all(root.join("node_modules/pkg/dist")).unwrap();
        fs::write(
            root.join("node_modules/pkg/package.json"),
            r#"{"main": "dist/main"}"#,
        )
        .unwrap();
        fs::write(root.join("node_modules/pkg/dist/main.js"), "").unwrap();

        let resolver = ModuleResolver::default();
        assert_eq!(resolver.resolve("./a", &root, None).unwrap(), root.join("a.js"));
        assert_eq!(
            resolver.resolve("./lib", &root, None).unwrap(),
            root.join("lib/index.json")
        );
        assert_eq!(
            resolver.resolve("pkg", &root.join("lib"), None).unwrap(),
            root.join("node_modules/pkg/dist/main.js")
        );
        assert_eq!(
            resolver.resolve("pkg/dist/main", &root, None).unwrap(),
            root.join("node_modules/pkg/dist/main.js")
        );

        let err = resolver.resolve("./missing", &root, None).unwrap_err();
        assert_eq!(err.code(), "MODULE_NOT_FOUND");
    }

    #[test]
    fn test_resolve_with_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("other")).unwrap();
        fs::write(root.join("other/b.js"), "").unwrap();

        let resolver = ModuleResolver::default();
        let found = resolver
            .resolve("./b", Path::new("/nowhere"), Some(&[root.join("other")][..]))
            .unwrap();
        assert_eq!(found, root.join("other/b.js"));
    }
}
