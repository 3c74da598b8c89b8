//! Circular navigation over materialized highlights.
//!
//! The navigator only remembers a count and a 1-based position. Every move
//! looks the target marker up live in the document, so a marker removed by
//! the renderer is detected instead of followed.

use crate::document::Document;
use crate::source::NodeId;

/// Navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// The match that just became current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    /// 1-based position among the matches.
    pub index: usize,
    /// The marker node to bring into view.
    pub node: NodeId,
}

/// What a navigation request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Focus moved to a live marker.
    Moved(Focus),
    /// There are no matches. Nothing changed.
    Empty,
    /// The target marker is gone. The result set needs a fresh scan.
    Stale,
}

/// Tracks the current match over `[1, count]`; 0 means none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigator {
    count: usize,
    current: usize,
}

impl Navigator {
    /// A navigator with no matches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with `count` fresh matches and no current one.
    pub fn reset(&mut self, count: usize) {
        self.count = count;
        self.current = 0;
    }

    /// Number of matches.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Current 1-based position, 0 when nothing is focused.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Focus the first match, as done right after a scan completes.
    pub fn focus_first(&mut self, doc: &mut Document) -> NavOutcome {
        if self.count == 0 {
            return NavOutcome::Empty;
        }
        self.focus(doc, 1)
    }

    /// Move one match forward or back, wrapping at either end.
    pub fn step(&mut self, doc: &mut Document, direction: Direction) -> NavOutcome {
        if self.count == 0 {
            return NavOutcome::Empty;
        }
        let target = match direction {
            Direction::Next if self.current >= self.count => 1,
            Direction::Next => self.current + 1,
            Direction::Previous if self.current <= 1 => self.count,
            Direction::Previous => self.current - 1,
        };
        self.focus(doc, target)
    }

    fn focus(&mut self, doc: &mut Document, target: usize) -> NavOutcome {
        let Some(node) = doc.mark(target - 1) else {
            log::debug!("navigation: marker {target} of {} vanished", self.count);
            return NavOutcome::Stale;
        };
        if self.current != 0 {
            if let Some(prev) = doc.mark(self.current - 1) {
                doc.set_current(prev, false);
            }
        }
        doc.set_current(node, true);
        self.current = target;
        NavOutcome::Moved(Focus {
            index: target,
            node,
        })
    }
}
