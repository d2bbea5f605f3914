//! Dotted paths into map models
//!
//! Provides [`ModelPath`], the `info.manager.id` style addressing used by
//! the CLI and tests to reach into a [`MapModel`](crate::MapModel).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path within a map model
///
/// Segments containing a space, a dot or a slash are written quoted, so
/// `info."a.b".id` has three segments.
///
/// # Examples
/// - `["info", "manager", "id"]` → `info.manager.id`
/// - `["sys", "nativeIdentity"]` → `sys.nativeIdentity`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ModelPath(Vec<String>);

impl ModelPath {
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Empty path (the whole model)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Path without its first segment
    #[inline]
    #[must_use]
    pub fn tail(&self) -> Self {
        Self(self.0.iter().skip(1).cloned().collect())
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn needs_quotes(segment: &str) -> bool {
    segment.contains([' ', '.', '/'])
}

impl Display for ModelPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|seg| {
                if needs_quotes(seg) {
                    format!("\"{seg}\"")
                } else {
                    seg.clone()
                }
            })
            .collect();
        write!(f, "{}", rendered.join("."))
    }
}

impl FromStr for ModelPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut was_quoted = false;

        for c in s.chars() {
            match c {
                '"' => {
                    quoted = !quoted;
                    was_quoted = true;
                }
                '.' if !quoted => {
                    if current.is_empty() && !was_quoted {
                        return Err(PathError::EmptySegment);
                    }
                    segments.push(std::mem::take(&mut current));
                    was_quoted = false;
                }
                _ => current.push(c),
            }
        }

        if quoted {
            return Err(PathError::UnterminatedQuote(s.to_string()));
        }
        if current.is_empty() && !was_quoted {
            return Err(PathError::EmptySegment);
        }
        segments.push(current);

        Ok(Self(segments))
    }
}

impl From<Vec<String>> for ModelPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// Errors related to model paths
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path contains empty segment")]
    EmptySegment,

    #[error("unterminated quote in path: {0}")]
    UnterminatedQuote(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn path_from_str_plain() {
        let path: ModelPath = "info.manager.id".parse().unwrap();
        assert_eq!(path.segments(), &["info", "manager", "id"]);
        assert_eq!(path.first(), Some("info"));
        assert_eq!(path.tail().segments(), &["manager", "id"]);
    }

    #[test]
    fn path_from_str_quoted() {
        let path: ModelPath = r#"info."a.b".id"#.parse().unwrap();
        assert_eq!(path.segments(), &["info", "a.b", "id"]);
    }

    #[test]
    fn path_display_quotes_when_needed() {
        let path = ModelPath::single("info").child("Group Name").child("id");
        assert_eq!(path.to_string(), r#"info."Group Name".id"#);
        let plain = ModelPath::single("sys").child("id");
        assert_eq!(plain.to_string(), "sys.id");
    }

    #[test]
    fn path_from_str_empty_is_root() {
        let path: ModelPath = "".parse().unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn path_from_str_empty_segment() {
        assert_eq!("a..b".parse::<ModelPath>(), Err(PathError::EmptySegment));
        assert_eq!("a.".parse::<ModelPath>(), Err(PathError::EmptySegment));
    }

    #[test]
    fn path_from_str_unterminated() {
        let result = r#"a."b"#.parse::<ModelPath>();
        assert!(matches!(result, Err(PathError::UnterminatedQuote(_))));
    }

    proptest! {
        #[test]
        fn display_parse_round_trip(segs in proptest::collection::vec("[a-zA-Z0-9 ./_]{1,8}", 1..5)) {
            let path = ModelPath::new(segs);
            let parsed: ModelPath = path.to_string().parse().unwrap();
            prop_assert_eq!(parsed, path);
        }
    }
}
