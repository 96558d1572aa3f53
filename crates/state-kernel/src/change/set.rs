use std::collections::VecDeque;
use std::fmt;

use super::{Change, ChangeKind};

/// Ordered group of changes forming one undoable player action.
///
/// Changes are prepended as they are recorded, so the set is stored
/// most-recent-first: undo walks it front to back, redo walks it back to front
/// and thereby re-executes in original order. A set becomes immutable once
/// closed.
pub struct ChangeSet {
    label: String,
    changes: VecDeque<Box<dyn Change>>,
    closed: bool,
}

impl ChangeSet {
    pub(crate) fn open(label: String) -> Self {
        Self {
            label,
            changes: VecDeque::new(),
            closed: false,
        }
    }

    pub(crate) fn push(&mut self, change: Box<dyn Change>) {
        debug_assert!(!self.closed, "change recorded into a closed change set");
        self.changes.push_front(change);
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    /// Undoes every change, most recent first.
    pub(crate) fn undo(&self) {
        for change in &self.changes {
            change.undo();
        }
    }

    /// Re-executes every change in original execution order.
    pub(crate) fn redo(&self) {
        for change in self.changes.iter().rev() {
            change.execute();
        }
    }

    /// Label given at `start`; empty when none was supplied.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Recorded changes, most recent first.
    pub fn changes(&self) -> impl Iterator<Item = &dyn Change> {
        self.changes.iter().map(|change| change.as_ref())
    }

    /// Change descriptions in execution order.
    pub fn descriptions(&self) -> Vec<String> {
        self.changes.iter().rev().map(|c| c.describe()).collect()
    }

    /// Change kinds in execution order.
    pub fn kinds(&self) -> Vec<ChangeKind> {
        self.changes.iter().rev().map(|c| c.kind()).collect()
    }
}

impl fmt::Debug for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSet")
            .field("label", &self.label)
            .field("closed", &self.closed)
            .field("changes", &self.descriptions())
            .finish()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.descriptions().join(", "))
        } else if self.changes.is_empty() {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{}: {}", self.label, self.descriptions().join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::cell::CellId;

    /// Appends to a shared trace so ordering can be asserted.
    struct Trace {
        id: CellId,
        tag: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Change for Trace {
        fn execute(&self) {
            self.log.borrow_mut().push(format!("exec {}", self.tag));
        }

        fn undo(&self) {
            self.log.borrow_mut().push(format!("undo {}", self.tag));
        }

        fn kind(&self) -> ChangeKind {
            ChangeKind::Replace
        }

        fn target(&self) -> &CellId {
            &self.id
        }

        fn describe(&self) -> String {
            self.tag.to_string()
        }
    }

    fn trace_set(log: &Rc<RefCell<Vec<String>>>) -> ChangeSet {
        let mut set = ChangeSet::open("trace".into());
        for tag in ["a", "b", "c"] {
            set.push(Box::new(Trace {
                id: CellId::new("t"),
                tag,
                log: Rc::clone(log),
            }));
        }
        set
    }

    #[test]
    fn undo_runs_most_recent_first_and_redo_in_original_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let set = trace_set(&log);

        set.undo();
        set.redo();

        assert_eq!(
            *log.borrow(),
            vec!["undo c", "undo b", "undo a", "exec a", "exec b", "exec c"]
        );
    }

    #[test]
    fn descriptions_follow_execution_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set = trace_set(&log);
        set.close();

        assert!(set.is_closed());
        assert_eq!(set.descriptions(), vec!["a", "b", "c"]);
        assert_eq!(set.changes().next().map(|c| c.describe()), Some("c".into()));
        assert_eq!(set.to_string(), "trace: a, b, c");
    }
}
