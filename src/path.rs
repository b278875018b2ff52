//! Host-side element paths.
//!
//! The engine addresses nodes with backslash separated paths:
//!
//! ```text
//! Skyrim.esm\ARMO\00012E46\KWDA\[2]
//! ^file      ^group ^record ^array ^index
//! ```
//!
//! A segment is a name, a signature, a form id, `[n]` for the n-th child,
//! or `.` to append an item to an array when adding.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Name(String),
    Index(usize),
    /// `.`: a new array item.
    Append,
}

impl Segment {
    fn parse(text: &str) -> Self {
        if text == "." {
            return Segment::Append;
        }
        text.strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|index| index.parse().ok())
            .map_or_else(|| Segment::Name(text.to_string()), Segment::Index)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "[{index}]"),
            Segment::Append => f.write_str("."),
        }
    }
}

impl From<&str> for Segment {
    fn from(text: &str) -> Self {
        Segment::parse(text)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// A parsed element path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ElementPath {
    segments: Vec<Segment>,
}

impl ElementPath {
    pub const SEPARATOR: char = '\\';

    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text`. Empty segments (doubled or trailing separators) are
    /// dropped.
    pub fn parse(text: &str) -> Self {
        Self {
            segments: text
                .split(Self::SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(Segment::parse)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.segments.push(segment.into());
    }

    /// This path extended by `segment`.
    pub fn join(&self, segment: impl Into<Segment>) -> Self {
        let mut joined = self.clone();
        joined.push(segment);
        joined
    }

    /// This path extended by every segment of `other`.
    pub fn concat(&self, other: &ElementPath) -> Self {
        let mut joined = self.clone();
        joined.segments.extend(other.segments.iter().cloned());
        joined
    }

    /// The path without its last segment. `None` for the empty path.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// Whether adding this path may create several nodes.
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::SEPARATOR)?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for ElementPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for ElementPath {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl FromIterator<Segment> for ElementPath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_segments() {
        let path = ElementPath::parse(r"Skyrim.esm\ARMO\00012E46\KWDA\[2]");
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&Segment::Name("Skyrim.esm".into())));
        assert_eq!(path.last(), Some(&Segment::Index(2)));
    }

    #[test]
    fn special_segments() {
        let path = ElementPath::parse(r"KWDA\.\[x]");
        assert_eq!(
            path.segments(),
            &[
                Segment::Name("KWDA".into()),
                Segment::Append,
                Segment::Name("[x]".into())
            ]
        );
    }

    #[test]
    fn display_normalises_separators() {
        let path = ElementPath::parse(r"\DATA\\Position\X\");
        assert_eq!(path.to_string(), r"DATA\Position\X");
    }

    #[test]
    fn compose() {
        let base = ElementPath::parse("Skyrim.esm");
        let path = base.join("ARMO").join(3usize);
        assert_eq!(path.to_string(), r"Skyrim.esm\ARMO\[3]");
        assert_eq!(path.parent().unwrap().to_string(), r"Skyrim.esm\ARMO");
        assert!(ElementPath::new().parent().is_none());
        assert_eq!(
            base.concat(&ElementPath::parse(r"ARMO\FULL")).to_string(),
            r"Skyrim.esm\ARMO\FULL"
        );
    }
}
