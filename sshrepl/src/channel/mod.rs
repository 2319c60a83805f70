//! Channel layer: markers, the pattern buffer and the expect interface.
//!
//! This module handles the interactive stream itself, including marker
//! matching, ANSI stripping and the [`Terminal`] trait the session
//! negotiators are written against.

mod buffer;
mod marker;
#[cfg(test)]
pub(crate) mod mock;
mod pty;
mod terminal;

pub use buffer::PatternBuffer;
pub use marker::{Marker, MarkerMatch, MarkerSet};
pub use pty::{PtyChannel, PtyConfig};
pub use terminal::{Match, Terminal, control_byte};
