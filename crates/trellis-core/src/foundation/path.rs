//! Slash-delimited resource paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The logical address of a resource, e.g. `users/42/devices`.
///
/// Segments are case-sensitive. Parsing drops leading and trailing slashes and
/// collapses empty segments; no other normalization is performed. The empty
/// path addresses the root of whatever handler receives the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// The empty path.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a `/`-delimited path.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Builds a path from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the empty path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the last segment.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns the path without its last segment.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(self.head(self.segments.len() - 1))
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::from_segments(segments)
    }

    /// Returns the first `n` segments.
    pub fn head(&self, n: usize) -> Self {
        Self {
            segments: self.segments[..n.min(self.segments.len())].to_vec(),
        }
    }

    /// Returns everything after the first `n` segments.
    pub fn tail(&self, n: usize) -> Self {
        Self {
            segments: self.segments[n.min(self.segments.len())..].to_vec(),
        }
    }

    /// Returns `true` if this path begins with all segments of `prefix`.
    pub fn starts_with(&self, prefix: &ResourcePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for ResourcePath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_outer_and_empty_segments() {
        let path = ResourcePath::parse("/users//42/");
        assert_eq!(path.segments(), ["users", "42"]);
        assert_eq!(path.to_string(), "users/42");
    }

    #[test]
    fn test_segments_are_case_sensitive() {
        assert_ne!(ResourcePath::parse("Users"), ResourcePath::parse("users"));
    }

    #[test]
    fn test_head_tail_and_prefix() {
        let path = ResourcePath::parse("users/42/devices");
        assert_eq!(path.head(1), ResourcePath::parse("users"));
        assert_eq!(path.tail(1), ResourcePath::parse("42/devices"));
        assert!(path.tail(3).is_empty());
        assert!(path.starts_with(&ResourcePath::parse("users/42")));
        assert!(!path.starts_with(&ResourcePath::parse("users/4")));
        assert_eq!(path.leaf(), Some("devices"));
        assert_eq!(path.parent(), Some(ResourcePath::parse("users/42")));
        assert_eq!(ResourcePath::empty().parent(), None);
    }
}
