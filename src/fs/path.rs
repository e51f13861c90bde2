// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Canonicalized iRODS logical paths (spec.md §4.5).

use std::fmt;

/// An absolute, canonicalized iRODS logical path: an ordered sequence of
/// path segments plus a leaf name, from which the absolute path string is
/// always reconstructable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IrodsPath {
    segments: Vec<String>,
}

impl IrodsPath {
    /// Builds a canonical path from `raw`, resolving it against `home` when
    /// `raw` is not itself absolute.
    ///
    /// Canonicalization: OS separators become `/`, runs of `/` collapse,
    /// `.` segments are dropped, `..` pops the previous segment (discarded
    /// at root rather than erroring).
    pub fn new(raw: &str, home: &str) -> Self {
        let normalized = raw.replace('\\', "/");
        let absolute = if normalized.starts_with('/') {
            normalized
        } else {
            format!("{}/{}", home.trim_end_matches('/'), normalized)
        };

        let mut segments: Vec<String> = Vec::new();
        for part in absolute.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    segments.pop();
                },
                other => segments.push(other.to_string()),
            }
        }

        IrodsPath { segments }
    }

    pub fn root() -> Self {
        IrodsPath { segments: Vec::new() }
    }

    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn parent(&self) -> IrodsPath {
        let mut segments = self.segments.clone();
        segments.pop();
        IrodsPath { segments }
    }

    pub fn join(&self, child: &str) -> IrodsPath {
        let mut segments = self.segments.clone();
        for part in child.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    segments.pop();
                },
                other => segments.push(other.to_string()),
            }
        }
        IrodsPath { segments }
    }

    /// The absolute iRODS path, e.g. `/tempZone/home/rods/data.txt`.
    pub fn absolute(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Formats as the `irods://user@host:port/absolute/path` URI form
/// (spec.md §6).
pub struct IrodsUri<'a> {
    pub path: &'a IrodsPath,
    pub user: &'a str,
    pub host: &'a str,
    pub port: u16,
}

impl fmt::Display for IrodsUri<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "irods://{}@{}:{}{}", self.user, self.host, self.port, self.path.absolute())
    }
}

impl fmt::Display for IrodsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.absolute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths_against_home() {
        let p = IrodsPath::new("data.txt", "/tempZone/home/rods");
        assert_eq!(p.absolute(), "/tempZone/home/rods/data.txt");
    }

    #[test]
    fn collapses_dot_and_dot_dot_segments() {
        let p = IrodsPath::new("/a//b/./c/../d", "/ignored");
        assert_eq!(p.absolute(), "/a/b/d");
    }

    #[test]
    fn dot_dot_at_root_is_discarded_not_an_error() {
        let p = IrodsPath::new("/../../a", "/ignored");
        assert_eq!(p.absolute(), "/a");
    }

    #[test]
    fn displays_as_irods_uri() {
        let p = IrodsPath::new("/tempZone/home/rods/a.txt", "/ignored");
        let uri = IrodsUri { path: &p, user: "rods", host: "icat.example.org", port: 1247 };
        assert_eq!(uri.to_string(), "irods://rods@icat.example.org:1247/tempZone/home/rods/a.txt");
    }
}
