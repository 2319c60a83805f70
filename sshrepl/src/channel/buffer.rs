//! Pattern buffer with incremental tail search.
//!
//! Output accumulates here until one of the expected markers shows up. After
//! a failed search only the last `search_depth` bytes of the already-searched
//! region are searched again, so large outputs are not rescanned on every
//! chunk. Markers are assumed to be shorter than `search_depth`.

use bytes::{Buf, BytesMut};
use log::trace;

use super::marker::{MarkerMatch, MarkerSet};

/// Buffer for accumulating output and searching it for markers.
pub struct PatternBuffer {
    /// Unconsumed output with ANSI escape sequences removed.
    buffer: BytesMut,

    /// How far back from the previously searched end a new search starts.
    search_depth: usize,

    /// Buffer length at the last search that found nothing.
    searched_len: usize,

    /// Escape-sequence parser, kept across chunks so split sequences are
    /// still recognised.
    parser: Option<vte::Parser>,
}

impl PatternBuffer {
    /// Create a new pattern buffer.
    ///
    /// # Arguments
    ///
    /// * `search_depth` - Overlap re-searched after a miss; must exceed the
    ///   longest marker match.
    /// * `strip_ansi` - Remove ANSI escape sequences from incoming data.
    pub fn new(search_depth: usize, strip_ansi: bool) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            searched_len: 0,
            parser: strip_ansi.then(vte::Parser::new),
        }
    }

    /// Extend the buffer with new data.
    pub fn extend(&mut self, data: &[u8]) {
        match self.parser.as_mut() {
            Some(parser) => {
                let mut printable = Printable {
                    out: &mut self.buffer,
                };
                parser.advance(&mut printable, data);
            }
            None => self.buffer.extend_from_slice(data),
        }
        trace!("buffer: +{} bytes, {} buffered", data.len(), self.buffer.len());
    }

    /// Search for the earliest marker match.
    pub fn find_first(&mut self, markers: &MarkerSet) -> Option<MarkerMatch> {
        let offset = self.searched_len.saturating_sub(self.search_depth);
        match markers.find_first(&self.buffer[offset..]) {
            Some(m) => Some(MarkerMatch {
                index: m.index,
                start: m.start + offset,
                end: m.end + offset,
            }),
            None => {
                self.searched_len = self.buffer.len();
                None
            }
        }
    }

    /// Consume everything up to the end of `m`.
    ///
    /// Returns `(before, matched)`. Bytes after the match stay buffered for
    /// the next search.
    pub fn take_match(&mut self, m: &MarkerMatch) -> (String, String) {
        let mut consumed = self.buffer.split_to(m.end);
        let matched = consumed.split_off(m.start);
        self.searched_len = 0;
        (
            String::from_utf8_lossy(&consumed).into_owned(),
            String::from_utf8_lossy(&matched).into_owned(),
        )
    }

    /// Drop `n` bytes from the front.
    pub fn discard(&mut self, n: usize) {
        let n = n.min(self.buffer.len());
        self.buffer.advance(n);
        self.searched_len = self.searched_len.saturating_sub(n);
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.searched_len = 0;
    }

    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000, true)
    }
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .field("strip_ansi", &self.parser.is_some())
            .finish()
    }
}

/// vte performer keeping printable text and the line-control characters.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl vte::Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.extend_from_slice(&[byte]);
        }
    }
}
