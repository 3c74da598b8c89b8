//! Cooperative, cancellable scan of a whole content tree.
//!
//! A [`Scan`] never runs to completion in one call. Each [`Scan::step`]
//! processes one batch of nodes, bounded by both a node count and a time
//! budget, then returns so the host can service its own work before
//! scheduling the next slice. The traversal state is an explicit pre-order
//! stack of node ids, so the tree may change between slices: detached
//! nodes are skipped when popped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::{MatchSet, MatchSpan, SearchOptions, locate};
use crate::source::{NodeId, TextSource};

/// Shared cancellation flag, created fresh for every scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed at the next batch boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Limits for one scan slice. Whichever fires first ends the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceBudget {
    /// Nodes visited per batch. Zero is treated as one.
    pub max_nodes: usize,
    /// Wall time per batch.
    pub max_duration: Duration,
}

impl Default for SliceBudget {
    fn default() -> Self {
        Self {
            max_nodes: 100,
            max_duration: Duration::from_millis(8),
        }
    }
}

/// Result of one scan slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStep {
    /// Budget exhausted, more nodes remain. Schedule another slice.
    Yielded,
    /// Every node was visited. Carries the complete match set.
    Finished(MatchSet),
    /// The token was cancelled. Partial results were discarded.
    Cancelled,
}

/// Counters reported when a scan ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub nodes_visited: usize,
    pub batches: usize,
}

/// An in-flight scan of one query over one tree.
#[derive(Debug)]
pub struct Scan {
    query: String,
    options: SearchOptions,
    token: CancelToken,
    budget: SliceBudget,
    stack: Vec<NodeId>,
    seeded: bool,
    spans: Vec<MatchSpan>,
    stats: ScanStats,
}

impl Scan {
    /// Prepare a scan. Nothing is read until the first [`step`](Self::step).
    pub fn new(query: &str, options: SearchOptions, token: CancelToken, budget: SliceBudget) -> Self {
        Self {
            query: query.to_owned(),
            options,
            token,
            budget,
            stack: Vec::new(),
            seeded: false,
            spans: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    /// The query being searched.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The options in effect.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// The token guarding this scan.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Progress counters so far.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Run one batch.
    pub fn step<S: TextSource + ?Sized>(&mut self, source: &S) -> ScanStep {
        if self.token.is_cancelled() {
            return self.abort();
        }
        if !self.seeded {
            self.stack.push(source.root());
            self.seeded = true;
        }

        let started = Instant::now();
        let max_nodes = self.budget.max_nodes.max(1);
        let mut visited = 0;
        self.stats.batches += 1;

        while let Some(id) = self.stack.pop() {
            if !source.contains(id) || !source.is_searchable(id) {
                continue;
            }
            visited += 1;
            self.visit(source, id);
            let children = source.children(id);
            self.stack.extend(children.into_iter().rev());

            if visited >= max_nodes || started.elapsed() >= self.budget.max_duration {
                break;
            }
        }
        self.stats.nodes_visited += visited;

        if self.token.is_cancelled() {
            return self.abort();
        }
        if self.stack.is_empty() {
            log::debug!(
                "scan: {:?} finished, {} matches, {} nodes in {} batches",
                self.query,
                self.spans.len(),
                self.stats.nodes_visited,
                self.stats.batches,
            );
            return ScanStep::Finished(MatchSet::new(std::mem::take(&mut self.spans)));
        }
        ScanStep::Yielded
    }

    fn visit<S: TextSource + ?Sized>(&mut self, source: &S, id: NodeId) {
        let Some(text) = source.text(id) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        for range in locate(text, &self.query, self.options) {
            if let Some(matched) = text.get(range.clone()) {
                self.spans.push(MatchSpan {
                    node: id,
                    start: range.start,
                    end: range.end,
                    text: matched.to_owned(),
                });
            }
        }
    }

    fn abort(&mut self) -> ScanStep {
        log::debug!(
            "scan: {:?} cancelled after {} nodes, dropping {} partial matches",
            self.query,
            self.stats.nodes_visited,
            self.spans.len(),
        );
        self.spans.clear();
        self.stack.clear();
        ScanStep::Cancelled
    }
}
