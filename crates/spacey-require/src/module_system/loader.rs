// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source loading and the CommonJS function wrapper

use super::path;
use crate::error::{RequireError, Result};
use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;

/// Fetches the raw bytes of a module path.
///
/// A loader must return [`RequireError::ModuleNotExist`] when nothing exists
/// at the path, or when the path is a directory. Any other error is treated
/// as fatal by the resolver.
///
/// The loader runs while the registry's program cache holds the lock on the
/// requested path's shard. It must not call back into
/// [`Registry::compiled_program`](super::Registry::compiled_program) or
/// `require` on the same registry, or it can deadlock.
pub type SourceLoader = Arc<dyn Fn(&str) -> Result<Vec<u8>> + Send + Sync>;

/// Reads module sources from the host filesystem.
///
/// Relative module paths resolve against the process working directory.
pub fn default_source_loader(module_path: &str) -> Result<Vec<u8>> {
    let host_path = std::path::Path::new(module_path);
    let metadata = fs::metadata(host_path).map_err(not_exist_or_io)?;
    if metadata.is_dir() {
        return Err(RequireError::ModuleNotExist);
    }
    fs::read(host_path).map_err(not_exist_or_io)
}

fn not_exist_or_io(err: std::io::Error) -> RequireError {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => RequireError::ModuleNotExist,
        _ => RequireError::Io(err),
    }
}

/// Builds the script text compiled for a module: JSON files become an
/// assignment to `module.exports`, and everything is wrapped in the
/// `(exports, require, module)` function.
pub(crate) fn wrap_module(module_path: &str, source: &str) -> Result<String> {
    let body = if path::ext(module_path) == ".json" {
        let literal = serde_json::to_string(source).map_err(|e| RequireError::custom(e.to_string()))?;
        format!("module.exports = JSON.parse({})", literal)
    } else {
        strip_shebang(source).into_owned()
    };
    Ok(format!("(function(exports, require, module) {{{}\n}})", body))
}

/// Comments out a leading `#!` line so executable scripts still parse.
fn strip_shebang(source: &str) -> std::borrow::Cow<'_, str> {
    match source.strip_prefix("#!") {
        Some(rest) => std::borrow::Cow::Owned(format!("//{}", rest)),
        None => std::borrow::Cow::Borrowed(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_script() {
        let wrapped = wrap_module("/a/m.js", "exports.x = 1").unwrap();
        assert_eq!(wrapped, "(function(exports, require, module) {exports.x = 1\n})");
    }

    #[test]
    fn test_wrap_trailing_line_comment() {
        // The closing brace must not end up inside the comment
        let wrapped = wrap_module("/a/m.js", "exports.x = 1 // done").unwrap();
        assert!(wrapped.ends_with("// done\n})"));
    }

    #[test]
    fn test_wrap_json() {
        let wrapped = wrap_module("/a/data.json", "{\"a\": \"it's\"}").unwrap();
        assert_eq!(
            wrapped,
            "(function(exports, require, module) {module.exports = JSON.parse(\"{\\\"a\\\": \\\"it's\\\"}\")\n})"
        );
    }

    #[test]
    fn test_shebang_is_commented_out() {
        let wrapped = wrap_module("/bin/tool.js", "#!/usr/bin/env node\nexports.x = 1").unwrap();
        assert!(wrapped.contains("{///usr/bin/env node\nexports.x = 1"));
    }

    #[test]
    fn test_default_loader_missing_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = path::from_host(dir.path());

        let missing = default_source_loader(&format!("{}/nope.js", root)).unwrap_err();
        assert!(missing.is_not_exist());

        let directory = default_source_loader(&root).unwrap_err();
        assert!(directory.is_not_exist());

        std::fs::write(dir.path().join("file.js"), "x").unwrap();
        let under_file = default_source_loader(&format!("{}/file.js/index.js", root)).unwrap_err();
        assert!(under_file.is_not_exist());
    }

    #[test]
    fn test_default_loader_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.js"), "exports.ok = true").unwrap();
        let source = default_source_loader(&format!("{}/m.js", path::from_host(dir.path()))).unwrap();
        assert_eq!(source, b"exports.ok = true");
    }
}
