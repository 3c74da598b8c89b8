//! Search session: the state machine tying query intake, scanning,
//! highlighting, and navigation together.
//!
//! The session never blocks. Query edits arm a debounce deadline, option
//! toggles start a scan at once, and the host drives all remaining work by
//! calling [`SearchSession::tick`] from its idle callback. Each tick runs at
//! most one scan slice. Starting a scan always cancels the previous one
//! through its token, so at most one scan is ever in flight and a
//! superseded scan can never apply its results.

use std::time::{Duration, Instant};

use crate::config::SearchConfig;
use crate::document::Document;
use crate::event::{Event, EventListener, SearchStatus};
use crate::highlight;
use crate::navigation::{Direction, NavOutcome, Navigator};
use crate::search::{CancelToken, MatchSet, Scan, ScanStep, SearchOptions, SliceBudget};

/// Outcome of the most recent scan invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No active query.
    #[default]
    Idle,
    /// A scan is in flight.
    Scanning,
    /// The last scan finished and its highlights are applied.
    Completed,
    /// The last scan was superseded or cleared before finishing.
    Cancelled,
}

/// One search session over a document, owned by the hosting view.
pub struct SearchSession<L: EventListener> {
    query: String,
    options: SearchOptions,
    state: SessionState,
    debounce: Duration,
    budget: SliceBudget,
    /// Deadline after which a debounced scan of `query` starts.
    pending: Option<Instant>,
    scan: Option<Scan>,
    navigator: Navigator,
    /// Number of scans started so far.
    generation: u64,
    last_status: SearchStatus,
    listener: L,
}

impl<L: EventListener> SearchSession<L> {
    /// Create an idle session.
    pub fn new(config: &SearchConfig, listener: L) -> Self {
        Self {
            query: String::new(),
            options: config.initial_options(),
            state: SessionState::Idle,
            debounce: config.debounce(),
            budget: config.slice_budget(),
            pending: None,
            scan: None,
            navigator: Navigator::new(),
            generation: 0,
            last_status: SearchStatus::default(),
            listener,
        }
    }

    /// Current query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Current options.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Outcome of the most recent scan invocation.
    ///
    /// While a debounced query waits for its scan this still reports the
    /// previous outcome, even though its highlights are already gone. Use
    /// [`status`](Self::status) (`is_searching`) to tell whether results are
    /// current.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of scans started over the session's lifetime.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The attached listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Snapshot for display.
    pub fn status(&self) -> SearchStatus {
        SearchStatus {
            match_count: self.navigator.count(),
            current_index: self.navigator.current(),
            is_searching: !self.is_idle(),
            has_query: !self.query.is_empty(),
        }
    }

    /// No scan is scheduled or running.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.scan.is_none()
    }

    /// When the host must call [`tick`](Self::tick) next.
    ///
    /// `None` when idle, `now` while a scan is running, otherwise the armed
    /// debounce deadline.
    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        if self.scan.is_some() {
            return Some(now);
        }
        self.pending
    }

    /// Set the query. Empty clears the search; anything else (re)arms the
    /// debounce timer and drops the current highlights.
    pub fn perform_search(&mut self, doc: &mut Document, query: &str, now: Instant) {
        if query.is_empty() {
            self.clear_search(doc);
            return;
        }
        query.clone_into(&mut self.query);
        self.cancel_scan();
        self.drop_highlights(doc);
        self.pending = Some(now + self.debounce);
        log::trace!("session: query {:?}, scan armed", self.query);
        self.publish();
    }

    /// Clear the query and every highlight. No scan is scheduled.
    pub fn clear_search(&mut self, doc: &mut Document) {
        self.query.clear();
        self.pending = None;
        self.cancel_scan();
        self.drop_highlights(doc);
        self.state = SessionState::Idle;
        self.publish();
    }

    /// Flip case sensitivity. Rescans immediately when a query is active.
    pub fn toggle_case_sensitive(&mut self, doc: &mut Document) -> bool {
        let options = SearchOptions {
            case_sensitive: !self.options.case_sensitive,
            ..self.options
        };
        self.set_options(doc, options);
        self.options.case_sensitive
    }

    /// Flip whole-word matching. Rescans immediately when a query is active.
    pub fn toggle_whole_word(&mut self, doc: &mut Document) -> bool {
        let options = SearchOptions {
            whole_word: !self.options.whole_word,
            ..self.options
        };
        self.set_options(doc, options);
        self.options.whole_word
    }

    /// Replace both options. A change rescans immediately, skipping the
    /// debounce, when a query is active.
    pub fn set_options(&mut self, doc: &mut Document, options: SearchOptions) {
        if options == self.options {
            return;
        }
        self.options = options;
        if !self.query.is_empty() {
            self.start_scan(doc);
        }
    }

    /// Move to the next or previous match.
    ///
    /// If the target marker vanished the result set is stale: a fresh scan
    /// starts instead of navigating.
    pub fn navigate(&mut self, doc: &mut Document, direction: Direction) -> NavOutcome {
        let outcome = self.navigator.step(doc, direction);
        match outcome {
            NavOutcome::Moved(focus) => {
                self.listener.send_event(Event::ScrollIntoView {
                    node: focus.node,
                    index: focus.index,
                });
                self.publish();
            }
            NavOutcome::Stale => {
                log::debug!("session: stale highlight, rescanning {:?}", self.query);
                self.start_scan(doc);
            }
            NavOutcome::Empty => {}
        }
        outcome
    }

    /// The renderer swapped or rebuilt its content: old highlights are
    /// meaningless. Rescans the active query at once.
    pub fn content_changed(&mut self, doc: &mut Document) {
        if self.query.is_empty() {
            self.cancel_scan();
            self.drop_highlights(doc);
            self.publish();
            return;
        }
        self.start_scan(doc);
    }

    /// Do one unit of pending work. Returns whether more work remains.
    ///
    /// Starts the debounced scan once its deadline has passed, then runs at
    /// most one scan slice.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> bool {
        if self.pending.is_some_and(|deadline| now >= deadline) {
            self.start_scan(doc);
        }

        if let Some(scan) = self.scan.as_mut() {
            match scan.step(doc) {
                ScanStep::Yielded => {}
                ScanStep::Finished(set) => {
                    self.scan = None;
                    self.complete(doc, &set);
                }
                ScanStep::Cancelled => {
                    self.scan = None;
                    self.state = SessionState::Cancelled;
                    self.publish();
                }
            }
        }

        !self.is_idle()
    }

    /// Cancel everything and strip highlights. The session is consumed.
    pub fn teardown(mut self, doc: &mut Document) {
        self.pending = None;
        self.cancel_scan();
        highlight::strip(doc);
        log::trace!("session: torn down after {} scans", self.generation);
    }

    fn start_scan(&mut self, doc: &mut Document) {
        self.pending = None;
        self.cancel_scan();
        // Scan clean text, never fragments split by old markers.
        self.drop_highlights(doc);

        self.generation += 1;
        self.scan = Some(Scan::new(&self.query, self.options, CancelToken::new(), self.budget));
        self.state = SessionState::Scanning;
        log::debug!(
            "session: scan #{} for {:?} ({:?})",
            self.generation,
            self.query,
            self.options
        );
        self.publish();
    }

    fn cancel_scan(&mut self) {
        if let Some(scan) = self.scan.take() {
            scan.token().cancel();
            self.state = SessionState::Cancelled;
        }
    }

    fn drop_highlights(&mut self, doc: &mut Document) {
        highlight::strip(doc);
        self.navigator.reset(0);
    }

    fn complete(&mut self, doc: &mut Document, set: &MatchSet) {
        let applied = highlight::apply(doc, set);
        self.navigator.reset(applied);
        self.state = SessionState::Completed;
        if let NavOutcome::Moved(focus) = self.navigator.focus_first(doc) {
            self.listener.send_event(Event::ScrollIntoView {
                node: focus.node,
                index: focus.index,
            });
        }
        self.publish();
    }

    fn publish(&mut self) {
        let status = self.status();
        if status != self.last_status {
            self.last_status = status;
            self.listener.send_event(Event::StatusChanged(status));
        }
    }
}

#[cfg(test)]
mod tests;
