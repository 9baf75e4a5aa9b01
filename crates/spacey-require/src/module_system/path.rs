// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical manipulation of slash-separated module paths.
//!
//! Module paths are keys, not filesystem paths: they always use `/`, are
//! never canonicalized against the disk, and relative ones stay relative.
//! A custom loader therefore sees exactly the strings these functions
//! produce.

/// Returns the shortest path equivalent to `path` by purely lexical
/// processing: repeated slashes collapse, `.` elements vanish, and `..`
/// removes the preceding element where there is one. `..` at the start of
/// a relative path is kept; `..` above the root of an absolute path is
/// dropped. An empty result becomes `.`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let p = path.as_bytes();
    let n = p.len();
    let rooted = p[0] == b'/';
    let mut out: Vec<u8> = Vec::with_capacity(n);
    let mut r = 0;
    // Length of the prefix `..` elements cannot backtrack into
    let mut dotdot = 0;

    if rooted {
        out.push(b'/');
        r = 1;
        dotdot = 1;
    }

    while r < n {
        if p[r] == b'/' {
            r += 1;
        } else if p[r] == b'.' && (r + 1 == n || p[r + 1] == b'/') {
            r += 1;
        } else if p[r] == b'.' && p[r + 1] == b'.' && (r + 2 == n || p[r + 2] == b'/') {
            r += 2;
            if out.len() > dotdot {
                let mut w = out.len() - 1;
                while w > dotdot && out[w] != b'/' {
                    w -= 1;
                }
                out.truncate(w);
            } else if !rooted {
                if !out.is_empty() {
                    out.push(b'/');
                }
                out.extend_from_slice(b"..");
                dotdot = out.len();
            }
        } else {
            if (rooted && out.len() != 1) || (!rooted && !out.is_empty()) {
                out.push(b'/');
            }
            while r < n && p[r] != b'/' {
                out.push(p[r]);
                r += 1;
            }
        }
    }

    if out.is_empty() {
        return ".".to_string();
    }
    // Only ASCII separators were inserted or removed
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Joins two paths with a separator and cleans the result. Empty elements
/// are ignored; joining two empty strings yields an empty string.
pub fn join(base: &str, elem: &str) -> String {
    match (base.is_empty(), elem.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(elem),
        (false, true) => clean(base),
        (false, false) => clean(&format!("{}/{}", base, elem)),
    }
}

/// Everything but the last element, cleaned.
pub fn dir(path: &str) -> String {
    match path.rfind('/') {
        Some(i) => clean(&path[..=i]),
        None => ".".to_string(),
    }
}

/// The last element. Trailing slashes are ignored; an empty path is `.`
/// and a path of only slashes is `/`.
pub fn base(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Whether the path starts at the root.
pub fn is_abs(path: &str) -> bool {
    path.starts_with('/')
}

/// The extension of the last element, including the dot, or `""`.
pub fn ext(path: &str) -> &str {
    for (i, b) in path.bytes().enumerate().rev() {
        match b {
            b'/' => break,
            b'.' => return &path[i..],
            _ => {}
        }
    }
    ""
}

/// Whether a specifier names a file location rather than a package:
/// absolute, `.`/`..`, or starting with `./` or `../`.
pub fn is_file_specifier(specifier: &str) -> bool {
    is_abs(specifier)
        || specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Converts a host path into module path form.
pub fn from_host(path: &std::path::Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        let cases = [
            ("", "."),
            (".", "."),
            ("/", "/"),
            ("abc", "abc"),
            ("abc/def/", "abc/def"),
            ("a//b", "a/b"),
            ("./a/./b/.", "a/b"),
            ("a/b/../c", "a/c"),
            ("a/..", "."),
            ("../a", "../a"),
            ("../../a/../b", "../../b"),
            ("a/../../b", "../b"),
            ("/..", "/"),
            ("/../a", "/a"),
            ("/home/src/./app/../x.js", "/home/src/x.js"),
            ("./node_modules/app14", "node_modules/app14"),
        ];
        for (input, expected) in cases {
            assert_eq!(clean(input), expected, "clean({:?})", input);
        }
    }

    #[test]
    fn test_clean_keeps_non_ascii() {
        assert_eq!(clean("./модули/../файл.js"), "файл.js");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/home/src", "./app"), "/home/src/app");
        assert_eq!(join("/home/src", "../app"), "/home/app");
        assert_eq!(join(".", "app14"), "app14");
        assert_eq!(join("/", "./app12"), "/app12");
        assert_eq!(join("..", "node_modules"), "../node_modules");
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", ""), "a");
        assert_eq!(join("", ""), "");
    }

    #[test]
    fn test_dir_and_base() {
        assert_eq!(dir("/home/src/test.js"), "/home/src");
        assert_eq!(dir("test.js"), ".");
        assert_eq!(dir("../test.js"), "..");
        assert_eq!(dir("/test.js"), "/");
        assert_eq!(dir("/"), "/");
        assert_eq!(dir("."), ".");

        assert_eq!(base("/home/src/node_modules"), "node_modules");
        assert_eq!(base("node_modules/"), "node_modules");
        assert_eq!(base("."), ".");
        assert_eq!(base(""), ".");
        assert_eq!(base("//"), "/");
    }

    #[test]
    fn test_ext() {
        assert_eq!(ext("/a/b.json"), ".json");
        assert_eq!(ext("/a.d/b"), "");
        assert_eq!(ext("m.js.map"), ".map");
        assert_eq!(ext(""), "");
    }

    #[test]
    fn test_file_specifiers() {
        assert!(is_file_specifier("/abs"));
        assert!(is_file_specifier("./rel"));
        assert!(is_file_specifier("../rel"));
        assert!(is_file_specifier("."));
        assert!(is_file_specifier(".."));
        assert!(!is_file_specifier("pkg"));
        assert!(!is_file_specifier(".hidden"));
        assert!(!is_file_specifier("node:util"));
    }
}
