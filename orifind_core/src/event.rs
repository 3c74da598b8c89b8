//! Events published by a search session and the listener that receives them.
//!
//! Events flow outward from [`SearchSession`](crate::session::SearchSession)
//! to the host. The `EventListener` trait decouples the session from any
//! particular UI: tests use `VoidListener` or a recording listener, the
//! terminal front end forwards events to its render loop.

use std::fmt;

use crate::source::NodeId;

/// What the UI displays about the current search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStatus {
    /// Number of live highlights.
    pub match_count: usize,
    /// 1-based index of the focused match, 0 when none.
    pub current_index: usize,
    /// A scan is scheduled or running.
    pub is_searching: bool,
    /// The query is non-empty.
    pub has_query: bool,
}

impl SearchStatus {
    /// Whether previous/next controls should be enabled.
    pub fn can_navigate(&self) -> bool {
        self.match_count > 0 && !self.is_searching
    }

    /// The status line text. Empty when there is no query.
    pub fn status_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_searching {
            write!(f, "Searching…")
        } else if !self.has_query {
            Ok(())
        } else if self.match_count == 0 {
            write!(f, "No results found")
        } else {
            write!(f, "{} of {} results", self.current_index, self.match_count)
        }
    }
}

/// Signals from the session to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Count, position, or searching flag changed.
    StatusChanged(SearchStatus),
    /// Bring the focused highlight into view.
    ScrollIntoView {
        /// The marker node.
        node: NodeId,
        /// Its 1-based position among the matches.
        index: usize,
    },
}

/// Receives session events.
///
/// The default implementation is a no-op, so `VoidListener` needs no
/// method body.
pub trait EventListener {
    /// Handle a session event. Default: no-op.
    fn send_event(&self, _event: Event) {}
}

/// No-op listener for tests and headless use.
pub struct VoidListener;

impl EventListener for VoidListener {}

#[cfg(test)]
mod tests;
