//! Highlight materialization: turning a match set into markers and back.
//!
//! Markers live in the document itself as `Mark` nodes. Before any new set
//! is applied every old marker is unwrapped and the split text runs are
//! merged again, so the next scan sees the same text nodes the renderer
//! produced and never fragments left over from an earlier search.

use std::fmt;

use crate::document::{Document, WrapRange};
use crate::search::{MatchSet, MatchSpan};
use crate::source::{NodeId, TextSource};

/// Why one span could not be materialized. Never fatal: the span is
/// skipped and the rest of the set still applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeError {
    /// The node was detached after the scan read it.
    NodeMissing(NodeId),
    /// The node is no longer a plain text run.
    NotText(NodeId),
    /// Offsets are empty, out of bounds, or split a character.
    InvalidRange { node: NodeId, start: usize, end: usize },
    /// The text under the span differs from what the scan matched.
    TextChanged(NodeId),
}

impl fmt::Display for MaterializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeMissing(id) => write!(f, "node {id} is no longer attached"),
            Self::NotText(id) => write!(f, "node {id} is not a text node"),
            Self::InvalidRange { node, start, end } => {
                write!(f, "range {start}..{end} is not valid in node {node}")
            }
            Self::TextChanged(id) => write!(f, "text of node {id} changed since the scan"),
        }
    }
}

impl std::error::Error for MaterializeError {}

/// Remove every marker, restoring plain merged text. Returns the number
/// of markers removed. Idempotent.
pub fn strip(doc: &mut Document) -> usize {
    let removed = doc.unwrap_all_marks();
    if removed > 0 {
        log::trace!("highlight: stripped {removed} markers");
    }
    removed
}

/// Strip old markers, then wrap every valid span of `set` in a marker.
///
/// Sequence indices run `0..n` over the markers actually created, in
/// document order. Returns `n`, which is below `set.len()` when spans went
/// stale between scan and apply.
pub fn apply(doc: &mut Document, set: &MatchSet) -> usize {
    strip(doc);

    let mut skipped = 0;
    let mut ranges = Vec::with_capacity(set.len());
    for (seq, span) in set.iter().enumerate() {
        match check(doc, span) {
            Ok(()) => ranges.push(WrapRange {
                node: span.node,
                range: span.start..span.end,
                seq,
            }),
            Err(e) => {
                log::debug!("highlight: skipping match {seq}: {e}");
                skipped += 1;
            }
        }
    }
    for (seq, e) in doc.wrap_ranges(&ranges) {
        log::debug!("highlight: skipping match {seq}: {e}");
        skipped += 1;
    }

    let applied = doc.renumber_marks();
    log::debug!("highlight: applied {applied} markers, skipped {skipped}");
    applied
}

/// Re-validate a span against the live text before wrapping it.
fn check(doc: &Document, span: &MatchSpan) -> Result<(), MaterializeError> {
    if !doc.contains(span.node) {
        return Err(MaterializeError::NodeMissing(span.node));
    }
    let text = doc.text(span.node).ok_or(MaterializeError::NotText(span.node))?;
    let current = text.get(span.start..span.end).ok_or(MaterializeError::InvalidRange {
        node: span.node,
        start: span.start,
        end: span.end,
    })?;
    if current != span.text {
        return Err(MaterializeError::TextChanged(span.node));
    }
    Ok(())
}
