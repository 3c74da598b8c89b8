//! Match location and cooperative scanning.
//!
//! [`locate`] is the pure per-string matcher. [`Scan`] drives it across a
//! whole [`TextSource`](crate::source::TextSource) in bounded slices and
//! produces a [`MatchSet`] in document order.

mod locate;
mod scan;

use std::slice;

use crate::source::NodeId;

pub use locate::{is_word_char, locate};
pub use scan::{CancelToken, Scan, ScanStats, ScanStep, SliceBudget};

/// Matching options. Changing either invalidates the current result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
}

/// One located occurrence of the query.
///
/// Offsets are byte offsets into the node's text at scan time, with
/// `start < end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
    /// The matched slice of the original (unfolded) text.
    pub text: String,
}

/// Matches ordered by node document order, then start offset.
///
/// Spans within one node never overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    spans: Vec<MatchSpan>,
}

impl MatchSet {
    /// Wrap spans that are already in document order.
    pub fn new(spans: Vec<MatchSpan>) -> Self {
        Self { spans }
    }

    /// Number of spans.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether there are no spans.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans in document order.
    pub fn spans(&self) -> &[MatchSpan] {
        &self.spans
    }

    /// Iterate spans in document order.
    pub fn iter(&self) -> slice::Iter<'_, MatchSpan> {
        self.spans.iter()
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a MatchSpan;
    type IntoIter = slice::Iter<'a, MatchSpan>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
