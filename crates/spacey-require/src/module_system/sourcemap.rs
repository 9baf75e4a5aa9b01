// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! External source maps referenced by `//# sourceMappingURL=` comments

use super::loader::SourceLoader;
use super::path;
use crate::error::RequireError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

/// A version 3 source map, as referenced from a module's last line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

#[derive(Debug, Error)]
pub(crate) enum SourceMapError {
    #[error("{0}")]
    Load(RequireError),
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("invalid source map: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported data URL")]
    UnsupportedDataUrl,
}

const URL_MARKERS: [&str; 2] = ["//# sourceMappingURL=", "//@ sourceMappingURL="];

/// Finds the source map URL in the last non-blank line of `source`.
pub(crate) fn find_url(source: &str) -> Option<&str> {
    let last = source.lines().rev().find(|line| !line.trim().is_empty())?;
    let last = last.trim();
    URL_MARKERS
        .iter()
        .find_map(|marker| last.strip_prefix(marker))
        .map(str::trim)
        .filter(|url| !url.is_empty())
}

/// Loads the map at `url`, relative to the directory of `module_path`.
pub(crate) fn load(url: &str, module_path: &str, loader: &SourceLoader) -> Result<SourceMap, SourceMapError> {
    let bytes = match url.strip_prefix("data:") {
        Some(data) => decode_data_url(data)?,
        None => {
            let map_path = if path::is_abs(url) {
                path::clean(url)
            } else {
                path::join(&path::dir(module_path), url)
            };
            loader(&map_path).map_err(SourceMapError::Load)?
        }
    };
    Ok(serde_json::from_slice(&bytes)?)
}

fn decode_data_url(data: &str) -> Result<Vec<u8>, SourceMapError> {
    let (media, payload) = data.split_once(',').ok_or(SourceMapError::UnsupportedDataUrl)?;
    if !media.starts_with("application/json") || !media.ends_with(";base64") {
        return Err(SourceMapError::UnsupportedDataUrl);
    }
    Ok(STANDARD.decode(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MAP: &str = r#"{"version":3,"file":"m.js","sourceRoot":"","sources":["m.ts"],"names":[],"mappings":"AAAA"}"#;

    fn map_loader() -> SourceLoader {
        Arc::new(|p: &str| match p {
            "dir/m.js.map" => Ok(MAP.as_bytes().to_vec()),
            "dir/broken.map" => Ok(b"{ not json".to_vec()),
            _ => Err(RequireError::ModuleNotExist),
        })
    }

    #[test]
    fn test_find_url() {
        assert_eq!(find_url("x = 1\n//# sourceMappingURL=m.js.map\n"), Some("m.js.map"));
        assert_eq!(find_url("x = 1\n//@ sourceMappingURL=old.map"), Some("old.map"));
        assert_eq!(find_url("//# sourceMappingURL=m.js.map\nx = 1"), None);
        assert_eq!(find_url("x = 1"), None);
        assert_eq!(find_url(""), None);
    }

    #[test]
    fn test_load_relative_to_module() {
        let map = load("m.js.map", "dir/m.js", &map_loader()).unwrap();
        assert_eq!(map.version, 3);
        assert_eq!(map.file.as_deref(), Some("m.js"));
        assert_eq!(map.sources, vec!["m.ts"]);
        assert_eq!(map.mappings, "AAAA");
    }

    #[test]
    fn test_load_data_url() {
        let url = format!("data:application/json;charset=utf-8;base64,{}", STANDARD.encode(MAP));
        let map = load(&url, "dir/m.js", &map_loader()).unwrap();
        assert_eq!(map.sources, vec!["m.ts"]);
    }

    #[test]
    fn test_load_failures() {
        let loader = map_loader();
        assert!(matches!(
            load("missing.map", "dir/m.js", &loader),
            Err(SourceMapError::Load(RequireError::ModuleNotExist))
        ));
        assert!(matches!(load("broken.map", "dir/m.js", &loader), Err(SourceMapError::Parse(_))));
        assert!(matches!(
            load("data:text/plain,hello", "dir/m.js", &loader),
            Err(SourceMapError::UnsupportedDataUrl)
        ));
        assert!(matches!(
            load("data:application/json;base64,@@@", "dir/m.js", &loader),
            Err(SourceMapError::Decode(_))
        ));
    }
}
