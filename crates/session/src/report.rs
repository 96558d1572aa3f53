//! Append-only human-readable report of a session.
use std::cell::RefCell;

use state_kernel::{ChangeReporter, ChangeSet};

/// Collects one line per commit, undo and redo, plus session annotations.
#[derive(Debug, Default)]
pub struct ReportLog {
    lines: RefCell<Vec<String>>,
}

impl ReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotate(&self, text: impl Into<String>) {
        self.push(text.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.lines.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    /// Lines joined by newlines.
    pub fn text(&self) -> String {
        self.lines.borrow().join("\n")
    }

    fn push(&self, line: String) {
        tracing::trace!(line = %line, "report");
        self.lines.borrow_mut().push(line);
    }
}

impl ChangeReporter for ReportLog {
    fn committed(&self, set: &ChangeSet) {
        self.push(set.to_string());
    }

    fn undone(&self, set: &ChangeSet) {
        self.push(format!("undo {}", set.label()));
    }

    fn redone(&self, set: &ChangeSet) {
        self.push(format!("redo {}", set.label()));
    }
}
