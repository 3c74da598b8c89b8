//! Tests for status formatting and listeners.

use super::{Event, EventListener, SearchStatus, VoidListener};
use crate::source::NodeId;

#[test]
fn void_listener_accepts_events() {
    let listener = VoidListener;
    listener.send_event(Event::StatusChanged(SearchStatus::default()));
    listener.send_event(Event::ScrollIntoView {
        node: NodeId(1),
        index: 1,
    });
}

#[test]
fn idle_status_line_is_empty() {
    let status = SearchStatus::default();
    assert_eq!(status.status_line(), "");
    assert!(!status.can_navigate());
}

#[test]
fn searching_status_line() {
    let status = SearchStatus {
        match_count: 4,
        current_index: 2,
        is_searching: true,
        has_query: true,
    };
    assert_eq!(status.status_line(), "Searching…");
    assert!(!status.can_navigate());
}

#[test]
fn no_results_status_line() {
    let status = SearchStatus {
        has_query: true,
        ..SearchStatus::default()
    };
    assert_eq!(status.status_line(), "No results found");
    assert!(!status.can_navigate());
}

#[test]
fn counted_status_line() {
    let status = SearchStatus {
        match_count: 12,
        current_index: 3,
        is_searching: false,
        has_query: true,
    };
    assert_eq!(status.status_line(), "3 of 12 results");
    assert!(status.can_navigate());
}

#[test]
fn event_debug_names_variant() {
    let event = Event::ScrollIntoView {
        node: NodeId(5),
        index: 2,
    };
    assert_eq!(format!("{event:?}"), "ScrollIntoView { node: NodeId(5), index: 2 }");
}
