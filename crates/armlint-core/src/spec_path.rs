//! Canonical document identifiers
//!
//! A [`SpecPath`] names one API description document. Every spelling of the
//! same resource (backslashes, `file://` URIs, `.`/`..` segments, different
//! letter case) normalizes to the same key, so caches and dependency graphs
//! keyed by `SpecPath` hold at most one entry per document.
//!
//! The first spelling seen is kept for display and I/O; equality, ordering and
//! hashing only look at the lowercased key.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use percent_encoding::percent_decode_str;
use serde::{Serialize, Serializer};
use url::Url;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct SpecPath {
    display: String,
    key: String,
}

impl SpecPath {
    /// Normalize a raw spelling into a canonical document path.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(CoreError::InvalidPath("empty path".to_string()));
        }

        let display = if is_remote_spelling(raw) {
            let url = Url::parse(raw)
                .map_err(|e| CoreError::InvalidPath(format!("{}: {}", raw, e)))?;
            url.to_string()
        } else if raw.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("file:")) {
            let path = file_url_to_path(raw)
                .ok_or_else(|| CoreError::InvalidPath(format!("malformed file URI: {}", raw)))?;
            normalize_fs_path(&path)
        } else {
            normalize_fs_path(raw)
        };

        let key = display.to_lowercase();
        Ok(Self { display, key })
    }

    /// Build a path from a filesystem location, making it absolute against `cwd`.
    pub fn from_fs(path: &Path, cwd: &Path) -> Result<Self, CoreError> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        Self::new(absolute.to_string_lossy())
    }

    /// Resolve `reference` (the file part of a pointer) relative to this document.
    pub fn join(&self, reference: &str) -> Result<Self, CoreError> {
        if is_absolute_spelling(reference) {
            return Self::new(reference);
        }

        if self.is_remote() {
            let base = Url::parse(&self.display)
                .map_err(|e| CoreError::InvalidPath(format!("{}: {}", self.display, e)))?;
            let joined = base
                .join(reference)
                .map_err(|e| CoreError::InvalidPath(format!("{}: {}", reference, e)))?;
            return Self::new(joined.as_str());
        }

        let dir = match self.display.rfind('/') {
            Some(idx) => &self.display[..=idx],
            None => "",
        };
        Self::new(format!("{}{}", dir, reference.replace('\\', "/")))
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The case-folded comparison key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_remote(&self) -> bool {
        is_remote_spelling(&self.display)
    }

    pub fn file_name(&self) -> &str {
        self.display.rsplit('/').next().unwrap_or(&self.display)
    }

    /// True when any directory or file segment equals `segment` (case-insensitive).
    pub fn has_segment(&self, segment: &str) -> bool {
        let segment = segment.to_lowercase();
        self.key.split('/').any(|s| s == segment)
    }
}

impl PartialEq for SpecPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for SpecPath {}

impl Hash for SpecPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for SpecPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpecPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for SpecPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl Serialize for SpecPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

fn is_remote_spelling(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/' || bytes[2] == b'\\')
}

fn is_absolute_spelling(raw: &str) -> bool {
    raw.starts_with('/')
        || raw.starts_with('\\')
        || has_drive_prefix(raw)
        || is_remote_spelling(raw)
        || raw.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("file:"))
}

fn file_url_to_path(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() != "file" {
        return None;
    }

    let decoded = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
    // file:///C:/x yields "/C:/x"
    let path = match decoded.strip_prefix('/') {
        Some(rest) if has_drive_prefix(rest) => rest.to_string(),
        _ => decoded,
    };

    match url.host_str() {
        Some(host) if !host.is_empty() => Some(format!("//{}{}", host, path)),
        _ => Some(path),
    }
}

fn normalize_fs_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");

    let (root, rest) = if let Some(rest) = unified.strip_prefix("//") {
        ("//".to_string(), rest)
    } else if let Some(rest) = unified.strip_prefix('/') {
        ("/".to_string(), rest)
    } else if has_drive_prefix(&unified) {
        (format!("{}/", &unified[..2]), unified.get(3..).unwrap_or(""))
    } else {
        (String::new(), unified.as_str())
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if root.is_empty() => parts.push(".."),
                _ => {}
            },
            other => parts.push(other),
        }
    }

    format!("{}{}", root, parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spellings_normalize_to_one_key() {
        let forms = [
            "/specs/Microsoft.Foo/stable/2024-01-01/foo.json",
            "/specs/microsoft.foo/stable/2024-01-01/FOO.json",
            "\\specs\\Microsoft.Foo\\stable\\2024-01-01\\foo.json",
            "/specs/Microsoft.Foo/./stable/preview/../2024-01-01/foo.json",
            "file:///specs/Microsoft.Foo/stable/2024-01-01/foo.json",
        ];
        let first = SpecPath::new(forms[0]).unwrap();
        for form in &forms[1..] {
            assert_eq!(SpecPath::new(form).unwrap(), first, "{}", form);
        }
    }

    #[test]
    fn test_windows_file_uri() {
        let from_uri = SpecPath::new("file:///C:/specs/a%20b.json").unwrap();
        let from_path = SpecPath::new("c:\\specs\\a b.json").unwrap();
        assert_eq!(from_uri, from_path);
        assert_eq!(from_uri.as_str(), "C:/specs/a b.json");
    }

    #[test]
    fn test_join_relative_and_absolute() {
        let base = SpecPath::new("/specs/foo/stable/foo.json").unwrap();
        assert_eq!(
            base.join("../../common/types.json").unwrap().as_str(),
            "/specs/common/types.json"
        );
        assert_eq!(base.join("./bar.json").unwrap().as_str(), "/specs/foo/stable/bar.json");
        assert_eq!(base.join("/other/x.json").unwrap().as_str(), "/other/x.json");
    }

    #[test]
    fn test_join_remote() {
        let base = SpecPath::new("https://example.com/specs/foo/foo.json").unwrap();
        let joined = base.join("../common/types.json").unwrap();
        assert!(joined.is_remote());
        assert_eq!(joined.as_str(), "https://example.com/specs/common/types.json");
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(SpecPath::new("  "), Err(CoreError::InvalidPath(_))));
    }

    #[test]
    fn test_has_segment() {
        let path = SpecPath::new("/specs/foo/Examples/get.json").unwrap();
        assert!(path.has_segment("examples"));
        assert!(!path.has_segment("exam"));
        assert_eq!(path.file_name(), "get.json");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(
            segments in proptest::collection::vec("[a-zA-Z0-9._-]{1,8}", 1..6)
        ) {
            let raw = format!("/{}", segments.join("/"));
            let once = SpecPath::new(&raw).unwrap();
            let twice = SpecPath::new(once.as_str()).unwrap();
            prop_assert_eq!(once.as_str(), twice.as_str());
        }

        #[test]
        fn slash_direction_does_not_matter(
            segments in proptest::collection::vec("[a-zA-Z0-9_-]{1,8}", 1..6)
        ) {
            let forward = SpecPath::new(format!("/{}", segments.join("/"))).unwrap();
            let backward = SpecPath::new(format!("\\{}", segments.join("\\"))).unwrap();
            prop_assert_eq!(forward, backward);
        }
    }
}
