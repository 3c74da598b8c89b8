//! Incremental, cancellable in-document text search.
//!
//! This crate scans a live, externally mutable content tree for literal
//! matches without blocking the host's event loop. Work is split into
//! bounded slices that the host drives from its idle callback, a fresh
//! cancellation token guards every scan, and accepted matches are
//! materialized as highlight markers that can be navigated and stripped
//! again. It contains no terminal, rendering, or platform-specific code.

#![deny(unsafe_code)]

pub mod config;
pub mod document;
pub mod event;
pub mod highlight;
pub mod navigation;
pub mod search;
pub mod session;
pub mod source;

pub use config::SearchConfig;
pub use document::{Document, NodeFlags, NodeKind, WrapRange};
pub use event::{Event, EventListener, SearchStatus, VoidListener};
pub use navigation::{Direction, Focus, NavOutcome, Navigator};
pub use search::{CancelToken, MatchSet, MatchSpan, Scan, ScanStep, SearchOptions, SliceBudget};
pub use session::{SearchSession, SessionState};
pub use source::{NodeId, TextSource};
