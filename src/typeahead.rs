//! Typeahead queue
//!
//! Input actions that arrive while the keyboard is locked are deferred here
//! and replayed, in submission order, once the lock clears. The queue is
//! only ever non-empty while the keyboard is locked for a reason other than
//! "not connected"; connecting or disconnecting flushes it.

use std::collections::VecDeque;
use std::fmt;

/// One deferred action: a dispatch-table name and up to two parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeaheadEntry {
    pub action: String,
    pub args: Vec<String>,
}

impl TypeaheadEntry {
    pub fn new(action: &str, args: &[&str]) -> Self {
        Self {
            action: action.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Why an enqueue attempt was dropped instead of queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaDrop {
    /// No session to replay into
    NotConnected,
    /// An operator error is pending; typing through it is not meaningful
    OperatorError,
    /// Display is scroll-locked
    ScrollLocked,
    /// Typeahead disabled by configuration
    Disabled,
}

impl fmt::Display for TaDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaDrop::NotConnected => write!(f, "not connected"),
            TaDrop::OperatorError => write!(f, "operator error pending"),
            TaDrop::ScrollLocked => write!(f, "scroll lock"),
            TaDrop::Disabled => write!(f, "typeahead disabled"),
        }
    }
}

/// FIFO of deferred actions
#[derive(Debug, Default)]
pub struct TypeaheadQueue {
    entries: VecDeque<TypeaheadEntry>,
}

impl TypeaheadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TypeaheadEntry) {
        log::debug!("typeahead: queued {}", entry.action);
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<TypeaheadEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain the queue, reporting whether anything was discarded
    pub fn flush(&mut self) -> bool {
        let had = !self.entries.is_empty();
        if had {
            log::debug!("typeahead: flushing {} queued action(s)", self.entries.len());
        }
        self.entries.clear();
        had
    }
}
