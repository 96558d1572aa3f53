//! Linear undo/redo history owned by one session.
//!
//! [`ChangeStack`] is a cheap-clone handle. It holds at most one open
//! [`ChangeSet`] and the sequence of committed sets with a cursor on the last
//! applied one. Replaying a committed set never holds a borrow of the stack,
//! so observers notified during undo or redo may query it.
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::change::{Change, ChangeSet};
use crate::config::KernelConfig;
use crate::error::{KernelError, ProtocolViolation};

/// Hook invoked with closed change sets, typically feeding a report log.
///
/// All methods default to no-ops.
pub trait ChangeReporter {
    fn committed(&self, _set: &ChangeSet) {}

    fn undone(&self, _set: &ChangeSet) {}

    fn redone(&self, _set: &ChangeSet) {}
}

struct StackInner {
    config: KernelConfig,
    committed: RefCell<Vec<Rc<ChangeSet>>>,
    /// Index of the last applied set; `None` when nothing is applied.
    cursor: Cell<Option<usize>>,
    open: RefCell<Option<ChangeSet>>,
    reporter: RefCell<Option<Rc<dyn ChangeReporter>>>,
    unattached: Cell<u64>,
    last_violation: Cell<Option<ProtocolViolation>>,
}

/// Handle to a session's change history.
#[derive(Clone)]
pub struct ChangeStack {
    inner: Rc<StackInner>,
}

impl ChangeStack {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            inner: Rc::new(StackInner {
                config,
                committed: RefCell::new(Vec::new()),
                cursor: Cell::new(None),
                open: RefCell::new(None),
                reporter: RefCell::new(None),
                unattached: Cell::new(0),
                last_violation: Cell::new(None),
            }),
        }
    }

    pub fn config(&self) -> KernelConfig {
        self.inner.config
    }

    /// Installs the reporting hook, replacing any previous one.
    pub fn set_reporter(&self, reporter: Rc<dyn ChangeReporter>) {
        *self.inner.reporter.borrow_mut() = Some(reporter);
    }

    /// Opens a new change set.
    ///
    /// Returns `false`, leaving the open set untouched, if one is already open.
    pub fn start(&self, label: impl Into<String>) -> bool {
        let mut open = self.inner.open.borrow_mut();
        if open.is_some() {
            drop(open);
            return self.violation(ProtocolViolation::AlreadyOpen);
        }
        let label = label.into();
        tracing::debug!(label = %label, "change set opened");
        *open = Some(ChangeSet::open(label));
        true
    }

    /// Closes the open set and commits it onto the history.
    ///
    /// Any redo tail left by earlier undos is discarded first.
    pub fn finish(&self) -> bool {
        let Some(mut set) = self.inner.open.borrow_mut().take() else {
            return self.violation(ProtocolViolation::NothingOpen);
        };
        set.close();
        let set = Rc::new(set);

        {
            let mut committed = self.inner.committed.borrow_mut();
            let applied = self.inner.cursor.get().map_or(0, |index| index + 1);
            if committed.len() > applied {
                tracing::debug!(
                    discarded = committed.len() - applied,
                    "redo tail truncated by new commit"
                );
                committed.truncate(applied);
            }
            committed.push(Rc::clone(&set));
            self.inner.cursor.set(Some(committed.len() - 1));
        }

        tracing::debug!(label = %set.label(), changes = set.len(), "change set committed");
        self.report(|reporter| reporter.committed(&set));
        true
    }

    /// Reverts every change recorded in the open set and discards it.
    pub fn cancel(&self) -> bool {
        let Some(set) = self.inner.open.borrow_mut().take() else {
            return self.violation(ProtocolViolation::NothingOpen);
        };
        tracing::debug!(label = %set.label(), changes = set.len(), "change set cancelled");
        set.undo();
        true
    }

    /// Undoes the set at the cursor and moves the cursor back.
    pub fn undo(&self) -> bool {
        if self.is_open() {
            return self.violation(ProtocolViolation::ActionOpen);
        }
        let Some(index) = self.inner.cursor.get() else {
            return self.violation(ProtocolViolation::NothingToUndo);
        };
        let set = Rc::clone(&self.inner.committed.borrow()[index]);
        self.inner.cursor.set(index.checked_sub(1));

        tracing::debug!(label = %set.label(), index, "undo");
        set.undo();
        self.report(|reporter| reporter.undone(&set));
        true
    }

    /// Re-executes the set after the cursor and moves the cursor forward.
    pub fn redo(&self) -> bool {
        if self.is_open() {
            return self.violation(ProtocolViolation::ActionOpen);
        }
        let next = self.inner.cursor.get().map_or(0, |index| index + 1);
        let Some(set) = self.inner.committed.borrow().get(next).cloned() else {
            return self.violation(ProtocolViolation::NothingToRedo);
        };
        self.inner.cursor.set(Some(next));

        tracing::debug!(label = %set.label(), index = next, "redo");
        set.redo();
        self.report(|reporter| reporter.redone(&set));
        true
    }

    /// Force-commits any open set, then forgets the whole history.
    ///
    /// Used at barriers too complex to ever undo.
    pub fn clear(&self) {
        if self.is_open() {
            self.finish();
        }
        let discarded = {
            let mut committed = self.inner.committed.borrow_mut();
            let len = committed.len();
            committed.clear();
            len
        };
        self.inner.cursor.set(None);
        tracing::debug!(discarded, "history cleared");
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.borrow().is_some()
    }

    pub fn is_undoable(&self) -> bool {
        self.inner.cursor.get().is_some()
    }

    pub fn is_redoable(&self) -> bool {
        let next = self.inner.cursor.get().map_or(0, |index| index + 1);
        next < self.inner.committed.borrow().len()
    }

    /// Number of committed sets, applied or not.
    pub fn len(&self) -> usize {
        self.inner.committed.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.committed.borrow().is_empty()
    }

    /// Index of the last applied set, `None` when nothing is applied.
    pub fn cursor(&self) -> Option<usize> {
        self.inner.cursor.get()
    }

    /// Committed set at `index`.
    pub fn get(&self, index: usize) -> Option<Rc<ChangeSet>> {
        self.inner.committed.borrow().get(index).cloned()
    }

    /// Number of changes recorded in the open set, if any.
    pub fn open_len(&self) -> Option<usize> {
        self.inner.open.borrow().as_ref().map(ChangeSet::len)
    }

    /// Label of the open set, if any.
    pub fn open_label(&self) -> Option<String> {
        self.inner
            .open
            .borrow()
            .as_ref()
            .map(|set| set.label().to_string())
    }

    /// Mutations applied while no change set was open.
    pub fn unattached_count(&self) -> u64 {
        self.inner.unattached.get()
    }

    pub fn last_violation(&self) -> Option<ProtocolViolation> {
        self.inner.last_violation.get()
    }

    pub(crate) fn downgrade(&self) -> WeakStack {
        WeakStack(Rc::downgrade(&self.inner))
    }

    fn violation(&self, violation: ProtocolViolation) -> bool {
        tracing::warn!(code = violation.error_code(), "{violation}");
        self.inner.last_violation.set(Some(violation));
        false
    }

    fn report(&self, f: impl FnOnce(&dyn ChangeReporter)) {
        let reporter = self.inner.reporter.borrow().clone();
        if let Some(reporter) = reporter {
            f(reporter.as_ref());
        }
    }
}

impl Default for ChangeStack {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl std::fmt::Debug for ChangeStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStack")
            .field("len", &self.len())
            .field("cursor", &self.cursor())
            .field("open", &self.open_label())
            .finish()
    }
}

/// Non-owning reference from a cell to its session's history.
#[derive(Clone)]
pub(crate) struct WeakStack(Weak<StackInner>);

impl WeakStack {
    /// Executes `change` and attaches it to the open set.
    ///
    /// The change is executed before the stack is borrowed, so observers it
    /// triggers may record further changes.
    pub(crate) fn record(&self, change: Box<dyn Change>) {
        change.execute();
        tracing::trace!(cell = %change.target(), kind = %change.kind(), "change applied");

        let Some(inner) = self.0.upgrade() else {
            tracing::warn!(cell = %change.target(), "change applied after its history was dropped");
            return;
        };
        let mut open = inner.open.borrow_mut();
        if let Some(set) = open.as_mut() {
            set.push(change);
            return;
        }
        drop(open);

        inner.unattached.set(inner.unattached.get() + 1);
        tracing::warn!(
            cell = %change.target(),
            change = %change.describe(),
            "mutation applied outside an open change set; it cannot be undone"
        );
        if inner.config.strict_unattached {
            debug_assert!(
                false,
                "unattached mutation of {}: {}",
                change.target(),
                change.describe()
            );
        }
    }
}
