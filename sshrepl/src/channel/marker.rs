//! Markers: the literal or regex patterns that identify prompts and errors.

use std::fmt;

use memchr::memmem;
use regex::bytes::Regex;

use crate::error::ChannelError;

/// A single pattern searched for in terminal output.
///
/// Literals are matched with `memchr`'s substring search, patterns with a
/// byte regex. An empty literal never matches.
#[derive(Debug, Clone)]
pub enum Marker {
    /// Exact text.
    Literal(String),
    /// Regular expression.
    Pattern(Regex),
}

impl Marker {
    /// Create a literal marker.
    pub fn literal(text: impl Into<String>) -> Self {
        Marker::Literal(text.into())
    }

    /// Create a regex marker.
    pub fn pattern(pattern: &str) -> Result<Self, ChannelError> {
        Ok(Marker::Pattern(Regex::new(pattern)?))
    }

    /// Find the first occurrence, returning `(start, end)` byte offsets.
    pub fn find(&self, haystack: &[u8]) -> Option<(usize, usize)> {
        match self {
            Marker::Literal(text) if text.is_empty() => None,
            Marker::Literal(text) => {
                memmem::find(haystack, text.as_bytes()).map(|start| (start, start + text.len()))
            }
            Marker::Pattern(regex) => regex.find(haystack).map(|m| (m.start(), m.end())),
        }
    }

    /// Find the first occurrence in a string and return the matched text.
    pub fn find_str<'a>(&self, haystack: &'a str) -> Option<&'a str> {
        // Regex offsets on valid UTF-8 input may still split a codepoint for
        // byte-oriented patterns, hence `get`.
        self.find(haystack.as_bytes())
            .and_then(|(start, end)| haystack.get(start..end))
    }

    /// Check whether the marker occurs anywhere in `haystack`.
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        self.find(haystack).is_some()
    }

    /// The literal text or the regex source.
    pub fn as_str(&self) -> &str {
        match self {
            Marker::Literal(text) => text,
            Marker::Pattern(regex) => regex.as_str(),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Literal(text) => write!(f, "{text:?}"),
            Marker::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for Marker {
    fn from(text: &str) -> Self {
        Marker::literal(text)
    }
}

impl From<String> for Marker {
    fn from(text: String) -> Self {
        Marker::Literal(text)
    }
}

impl From<Regex> for Marker {
    fn from(regex: Regex) -> Self {
        Marker::Pattern(regex)
    }
}

/// Position of a marker hit inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMatch {
    /// Index of the marker within its [`MarkerSet`].
    pub index: usize,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

/// An ordered disjunction of markers.
///
/// When several markers match, the one starting earliest in the buffer wins;
/// on a tie the marker listed first wins.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    markers: Vec<Marker>,
}

impl MarkerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a marker.
    pub fn push(&mut self, marker: impl Into<Marker>) {
        self.markers.push(marker.into());
    }

    /// Append a marker, builder-style.
    pub fn with(mut self, marker: impl Into<Marker>) -> Self {
        self.push(marker);
        self
    }

    /// Append every marker of `other`, keeping order.
    pub fn extend_from(&mut self, other: &MarkerSet) {
        self.markers.extend(other.markers.iter().cloned());
    }

    /// A new set holding `self` followed by `other`.
    pub fn chain(&self, other: &MarkerSet) -> MarkerSet {
        let mut combined = self.clone();
        combined.extend_from(other);
        combined
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    /// Earliest match among all markers, ties resolved by list order.
    pub fn find_first(&self, haystack: &[u8]) -> Option<MarkerMatch> {
        let mut best: Option<MarkerMatch> = None;
        for (index, marker) in self.markers.iter().enumerate() {
            if let Some((start, end)) = marker.find(haystack) {
                if best.is_none_or(|b| start < b.start) {
                    best = Some(MarkerMatch { index, start, end });
                }
            }
        }
        best
    }
}

impl fmt::Display for MarkerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.markers.iter().map(|m| m.to_string()).collect();
        write!(f, "[{}]", parts.join(" | "))
    }
}

impl From<Marker> for MarkerSet {
    fn from(marker: Marker) -> Self {
        Self {
            markers: vec![marker],
        }
    }
}

impl From<&str> for MarkerSet {
    fn from(text: &str) -> Self {
        Marker::literal(text).into()
    }
}

impl From<String> for MarkerSet {
    fn from(text: String) -> Self {
        Marker::Literal(text).into()
    }
}

impl From<Vec<Marker>> for MarkerSet {
    fn from(markers: Vec<Marker>) -> Self {
        Self { markers }
    }
}

impl From<Vec<&str>> for MarkerSet {
    fn from(texts: Vec<&str>) -> Self {
        texts.into_iter().map(Marker::literal).collect()
    }
}

impl From<&[&str]> for MarkerSet {
    fn from(texts: &[&str]) -> Self {
        texts.iter().copied().map(Marker::literal).collect()
    }
}

impl<const N: usize> From<[&str; N]> for MarkerSet {
    fn from(texts: [&str; N]) -> Self {
        texts.into_iter().map(Marker::literal).collect()
    }
}

impl FromIterator<Marker> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        Self {
            markers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_find() {
        let marker = Marker::literal(">>>");
        assert_eq!(marker.find(b"4\n>>> "), Some((2, 5)));
        assert!(marker.find(b"no prompt").is_none());
    }

    #[test]
    fn test_empty_literal_never_matches() {
        assert!(!Marker::literal("").is_match(b"anything"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Marker::pattern(r"irb\(").unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPattern(_)));
    }

    #[test]
    fn test_pattern_find() {
        let marker = Marker::pattern(r"irb\(\w+\):\d+").unwrap();
        assert_eq!(marker.find_str("=> 2\nirb(main):002:0> "), Some("irb(main):002"));
    }

    #[test]
    fn test_earliest_match_wins() {
        let set = MarkerSet::from(["$", "password"]);
        let m = set.find_first(b"Enter password: $").unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.start, 6);
    }

    #[test]
    fn test_tie_goes_to_first_marker() {
        // ">>>" and ">" both start at offset 0; the interpreter prompt is
        // listed first and must win.
        let set = MarkerSet::from([">>>", ">"]);
        let m = set.find_first(b">>> ").unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.end, 3);
    }

    #[test]
    fn test_chain_keeps_order() {
        let ready = MarkerSet::from(">>>");
        let shell = MarkerSet::from(["#", "$"]);
        let combined = ready.chain(&shell);
        assert_eq!(combined.len(), 3);
        assert_eq!(combined.get(0).unwrap().as_str(), ">>>");
        assert_eq!(combined.get(2).unwrap().as_str(), "$");
    }

    #[test]
    fn test_display() {
        let set = MarkerSet::new()
            .with(">>>")
            .with(Marker::pattern(r"\.\.\. ").unwrap());
        assert_eq!(set.to_string(), r#"[">>>" | /\.\.\. /]"#);
    }
}
