use std::cell::RefCell;
use std::time::{Duration, Instant};

use super::{SearchSession, SessionState};
use crate::config::SearchConfig;
use crate::document::{Document, NodeKind};
use crate::event::{Event, EventListener, SearchStatus};
use crate::navigation::{Direction, NavOutcome};
use crate::source::{NodeId, TextSource};

/// Records every event for later inspection.
#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<Event>>,
}

impl Recorder {
    fn scrolls(&self) -> Vec<usize> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::ScrollIntoView { index, .. } => Some(*index),
                Event::StatusChanged(_) => None,
            })
            .collect()
    }

    fn last_status(&self) -> Option<SearchStatus> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            Event::StatusChanged(s) => Some(*s),
            Event::ScrollIntoView { .. } => None,
        })
    }
}

impl EventListener for Recorder {
    fn send_event(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

const DEBOUNCE: Duration = Duration::from_millis(300);

fn config(batch_nodes: usize) -> SearchConfig {
    let mut cfg = SearchConfig::default();
    cfg.search.debounce_ms = DEBOUNCE.as_millis() as u64;
    cfg.scan.batch_nodes = batch_nodes;
    // Far beyond any test run, so only the node budget ends a slice.
    cfg.scan.slice_ms = 3_600_000;
    cfg
}

fn session(batch_nodes: usize) -> SearchSession<Recorder> {
    SearchSession::new(&config(batch_nodes), Recorder::default())
}

/// Tick until idle, returning the number of ticks taken.
fn drain(session: &mut SearchSession<Recorder>, doc: &mut Document, now: Instant) -> usize {
    let mut ticks = 1;
    while session.tick(doc, now) {
        ticks += 1;
        assert!(ticks < 100_000, "session never went idle");
    }
    ticks
}

/// Query, let the debounce elapse, and run the scan to completion.
fn search(session: &mut SearchSession<Recorder>, doc: &mut Document, query: &str) {
    let now = Instant::now();
    session.perform_search(doc, query, now);
    drain(session, doc, now + DEBOUNCE);
}

fn quick_fox() -> Document {
    Document::from_plain_text("The Quick fox jumps. The quick fox runs.")
}

fn mark_texts(doc: &Document) -> Vec<String> {
    doc.marks().into_iter().map(|m| doc.text_content(m)).collect()
}

fn current_marks(doc: &Document) -> Vec<NodeId> {
    doc.marks().into_iter().filter(|&m| doc.is_current(m)).collect()
}

/// A flat document of `n` text nodes, each containing `text`.
fn wide(n: usize, text: &str) -> Document {
    let mut doc = Document::new("body");
    let root = doc.root();
    for _ in 0..n {
        doc.append_text(root, text);
    }
    doc
}

/// `sections` elements of `per_section` text nodes each.
fn nested(sections: usize, per_section: usize, text: &str) -> Document {
    let mut doc = Document::new("body");
    let root = doc.root();
    for _ in 0..sections {
        let Some(section) = doc.append_element(root, "section") else {
            continue;
        };
        for _ in 0..per_section {
            doc.append_text(section, text);
        }
    }
    doc
}

#[test]
fn quick_fox_scenario() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "quick");

    assert_eq!(s.state(), SessionState::Completed);
    let status = s.status();
    assert_eq!(status.match_count, 2);
    assert_eq!(status.current_index, 1);
    assert_eq!(status.status_line(), "1 of 2 results");

    s.navigate(&mut doc, Direction::Next);
    assert_eq!(s.status().current_index, 2);
    s.navigate(&mut doc, Direction::Next);
    assert_eq!(s.status().current_index, 1);
    assert_eq!(s.listener().scrolls(), vec![1, 2, 1]);
}

#[test]
fn debounce_waits_for_quiet_period() {
    let mut doc = quick_fox();
    let mut s = session(100);
    let t0 = Instant::now();

    s.perform_search(&mut doc, "qu", t0);
    assert!(s.status().is_searching);
    assert_eq!(s.status().status_line(), "Searching…");
    assert_eq!(s.next_wakeup(t0), Some(t0 + DEBOUNCE));

    // Another keystroke before the deadline pushes it back.
    let t1 = t0 + Duration::from_millis(200);
    assert!(s.tick(&mut doc, t1));
    s.perform_search(&mut doc, "quick", t1);
    assert!(s.tick(&mut doc, t0 + DEBOUNCE));
    assert_eq!(s.generation(), 0);

    drain(&mut s, &mut doc, t1 + DEBOUNCE);
    assert_eq!(s.generation(), 1);
    assert_eq!(s.status().match_count, 2);
    assert!(s.is_idle());
    assert_eq!(s.next_wakeup(t1 + DEBOUNCE), None);
}

#[test]
fn empty_query_clears_everything() {
    let mut doc = quick_fox();
    let root = doc.root();
    let original = doc.text_content(root);
    let mut s = session(100);
    search(&mut s, &mut doc, "fox");
    assert_eq!(doc.marks().len(), 2);

    s.perform_search(&mut doc, "", Instant::now());
    assert!(doc.marks().is_empty());
    assert_eq!(s.status().match_count, 0);
    assert_eq!(s.state(), SessionState::Idle);
    assert!(s.is_idle());
    assert_eq!(s.status().status_line(), "");
    assert_eq!(doc.text_content(root), original);
}

#[test]
fn clear_search_leaves_no_highlights() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "the");
    assert_eq!(s.status().match_count, 2);

    s.clear_search(&mut doc);
    assert!(doc.marks().is_empty());
    assert_eq!(s.status(), SearchStatus::default());
    assert_eq!(s.query(), "");
}

#[test]
fn repeated_search_is_idempotent() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "quick");
    let first = (s.status(), mark_texts(&doc), doc.marks());
    search(&mut s, &mut doc, "quick");
    let second = (s.status(), mark_texts(&doc), doc.marks().len());
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
    assert_eq!(first.2.len(), second.2);
}

#[test]
fn zero_matches_is_a_completed_search() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "zebra");
    assert_eq!(s.state(), SessionState::Completed);
    assert_eq!(s.status().match_count, 0);
    assert_eq!(s.status().status_line(), "No results found");
    assert_eq!(s.navigate(&mut doc, Direction::Next), NavOutcome::Empty);
    assert_eq!(s.navigate(&mut doc, Direction::Previous), NavOutcome::Empty);
    assert_eq!(s.status().current_index, 0);
}

#[test]
fn toggling_case_rescans_once_without_debounce() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "quick");
    assert_eq!(s.generation(), 1);
    assert_eq!(doc.marks().len(), 2);

    assert!(s.toggle_case_sensitive(&mut doc));
    // Old markers are gone before the new scan has produced anything.
    assert!(doc.marks().is_empty());
    assert_eq!(s.generation(), 2);
    assert_eq!(s.state(), SessionState::Scanning);

    // No debounce: the very first tick makes progress at the current instant.
    drain(&mut s, &mut doc, Instant::now());
    assert_eq!(s.generation(), 2);
    assert_eq!(mark_texts(&doc), vec!["quick".to_owned()]);
    assert_eq!(s.status().match_count, 1);
}

#[test]
fn toggling_whole_word_rescans_once() {
    let mut doc = Document::from_plain_text("cat category cats");
    let mut s = session(100);
    search(&mut s, &mut doc, "cat");
    assert_eq!(s.status().match_count, 3);

    assert!(s.toggle_whole_word(&mut doc));
    drain(&mut s, &mut doc, Instant::now());
    assert_eq!(s.generation(), 2);
    assert_eq!(s.status().match_count, 1);
    assert_eq!(mark_texts(&doc), vec!["cat".to_owned()]);

    assert!(!s.toggle_whole_word(&mut doc));
    drain(&mut s, &mut doc, Instant::now());
    assert_eq!(s.generation(), 3);
    assert_eq!(s.status().match_count, 3);
}

#[test]
fn toggling_without_query_does_not_scan() {
    let mut doc = quick_fox();
    let mut s = session(100);
    assert!(s.toggle_case_sensitive(&mut doc));
    assert!(s.is_idle());
    assert_eq!(s.generation(), 0);
    assert!(s.options().case_sensitive);
}

#[test]
fn superseded_scan_never_applies() {
    let mut doc = nested(100, 100, "alpha beta");
    assert!(doc.len() > 10_000);
    let mut s = session(64);
    let t0 = Instant::now();

    s.perform_search(&mut doc, "alpha", t0);
    assert!(s.tick(&mut doc, t0 + DEBOUNCE));
    assert_eq!(s.state(), SessionState::Scanning);
    assert!(s.tick(&mut doc, t0 + DEBOUNCE));

    // A new query arrives before the first scan is done.
    let t1 = t0 + DEBOUNCE + Duration::from_millis(1);
    s.perform_search(&mut doc, "beta", t1);
    assert_eq!(s.state(), SessionState::Cancelled);
    assert_eq!(s.generation(), 1);

    drain(&mut s, &mut doc, t1 + DEBOUNCE);
    assert_eq!(s.generation(), 2);
    assert_eq!(s.state(), SessionState::Completed);
    assert_eq!(s.status().match_count, 10_000);
    let marks = doc.marks();
    assert_eq!(marks.len(), 10_000);
    assert!(marks.iter().all(|&m| doc.text_content(m) == "beta"));
}

#[test]
fn scan_yields_between_slices() {
    let mut doc = wide(1_000, "x");
    let mut s = session(50);
    let t0 = Instant::now();
    s.perform_search(&mut doc, "x", t0);
    // Root + 1000 nodes at 50 per slice is 21 slices.
    let ticks = drain(&mut s, &mut doc, t0 + DEBOUNCE);
    assert_eq!(ticks, 21);
    assert_eq!(s.status().match_count, 1_000);
}

#[test]
fn status_shows_searching_while_scan_runs() {
    let mut doc = wide(500, "x");
    let mut s = session(10);
    let t0 = Instant::now();
    s.perform_search(&mut doc, "x", t0);
    s.tick(&mut doc, t0 + DEBOUNCE);
    let status = s.status();
    assert!(status.is_searching);
    assert!(!status.can_navigate());
    assert_eq!(s.navigate(&mut doc, Direction::Next), NavOutcome::Empty);
}

#[test]
fn navigation_marks_exactly_one_current() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "the");
    let marks = doc.marks();
    assert_eq!(current_marks(&doc), vec![marks[0]]);
    s.navigate(&mut doc, Direction::Previous);
    assert_eq!(current_marks(&doc), vec![marks[1]]);
    assert_eq!(s.status().current_index, 2);
}

#[test]
fn vanished_highlight_triggers_rescan() {
    let mut doc = Document::from_plain_text("fox one\n\nfox two\n\nfox three");
    let mut s = session(100);
    search(&mut s, &mut doc, "fox");
    assert_eq!(s.status().match_count, 3);

    // The renderer drops the second paragraph behind our back.
    let second = doc.children(doc.root())[1];
    doc.remove(second);

    assert_eq!(s.navigate(&mut doc, Direction::Next), NavOutcome::Stale);
    assert_eq!(s.state(), SessionState::Scanning);
    assert_eq!(s.generation(), 2);
    drain(&mut s, &mut doc, Instant::now());
    assert_eq!(s.status().match_count, 2);
    assert_eq!(s.status().current_index, 1);
}

#[test]
fn content_change_rescans_active_query() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "fox");

    let mut next = Document::from_plain_text("fox fox fox");
    s.content_changed(&mut next);
    drain(&mut s, &mut next, Instant::now());
    assert_eq!(s.status().match_count, 3);
    assert_eq!(s.generation(), 2);
}

#[test]
fn content_change_without_query_stays_idle() {
    let mut doc = quick_fox();
    let mut s = session(100);
    s.content_changed(&mut doc);
    assert!(s.is_idle());
    assert_eq!(s.generation(), 0);
}

#[test]
fn teardown_restores_document() {
    let mut doc = quick_fox();
    let root = doc.root();
    let original = doc.text_content(root);
    let nodes = doc.len();
    let mut s = session(100);
    search(&mut s, &mut doc, "o");
    assert!(!doc.marks().is_empty());

    s.teardown(&mut doc);
    assert!(doc.marks().is_empty());
    assert_eq!(doc.text_content(root), original);
    assert_eq!(doc.len(), nodes);
}

#[test]
fn markers_cover_matched_text_only() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "QUICK");
    for m in doc.marks() {
        let children = doc.children(m);
        assert_eq!(children.len(), 1);
        assert!(matches!(doc.kind(children[0]), Some(NodeKind::Text(_))));
    }
    assert_eq!(mark_texts(&doc), vec!["Quick".to_owned(), "quick".to_owned()]);
}

#[test]
fn status_events_are_deduplicated() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "fox");
    let events = s.listener().events.borrow().clone();
    let statuses: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::StatusChanged(st) => Some(*st),
            Event::ScrollIntoView { .. } => None,
        })
        .collect();
    assert!(statuses.windows(2).all(|w| w[0] != w[1]));
    assert_eq!(s.listener().last_status(), Some(s.status()));
}

#[test]
fn state_keeps_last_outcome_while_next_query_waits() {
    let mut doc = quick_fox();
    let mut s = session(100);
    search(&mut s, &mut doc, "quick");
    assert_eq!(s.state(), SessionState::Completed);

    s.perform_search(&mut doc, "fox", Instant::now());
    // Highlights are gone but no scan ran yet: only `is_searching` says so.
    assert_eq!(s.state(), SessionState::Completed);
    assert!(doc.marks().is_empty());
    let status = s.status();
    assert!(status.is_searching);
    assert_eq!(status.match_count, 0);
    assert_eq!(status.status_line(), "Searching…");
}
