use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use super::{CellCore, CellId, CellKind, CellValue};
use crate::change::{Change, ChangeKind};
use crate::error::StateError;
use crate::manager::StateManager;
use crate::observe::{Model, Observer};

/// Sorted set cell.
///
/// Adding a present element or removing an absent one records nothing, so
/// every recorded change is a real membership flip and undo simply flips back.
pub struct SetState<T: CellValue + Ord> {
    core: Rc<CellCore<BTreeSet<T>>>,
}

impl<T: CellValue + Ord> SetState<T> {
    pub fn new(manager: &StateManager, id: impl Into<String>) -> Result<Self, StateError> {
        let core = CellCore::create(manager, id, CellKind::Set, BTreeSet::new())?;
        Ok(Self { core })
    }

    pub fn id(&self) -> &CellId {
        self.core.id()
    }

    pub fn add(&self, value: T) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.record(SetOp::Add, value);
        true
    }

    pub fn remove(&self, value: &T) -> bool {
        if !self.contains(value) {
            return false;
        }
        self.record(SetOp::Remove, value.clone());
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.core.read(|set| set.contains(value))
    }

    pub fn len(&self) -> usize {
        self.core.read(BTreeSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.core.read(BTreeSet::is_empty)
    }

    /// Elements in ascending order.
    pub fn view(&self) -> Vec<T> {
        self.core.read(|set| set.iter().cloned().collect())
    }

    pub fn subscribe(&self, observer: Rc<dyn Observer>) {
        self.core.subscribe(observer);
    }

    pub fn add_model(&self, model: &Rc<Model>) {
        self.core.add_model(model);
    }

    pub fn render(&self) -> String {
        self.core.render()
    }

    #[must_use]
    pub fn with_formatter(self, formatter: impl Fn(&BTreeSet<T>) -> String + 'static) -> Self {
        self.core.set_formatter(Box::new(formatter));
        self
    }

    fn record(&self, op: SetOp, value: T) {
        self.core.record(Box::new(SetChange {
            cell: Rc::clone(&self.core),
            op,
            value,
        }));
    }
}

impl<T: CellValue + Ord> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: CellValue + Ord> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core
            .read(|set| f.debug_tuple("SetState").field(self.id()).field(set).finish())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SetOp {
    Add,
    Remove,
}

struct SetChange<T: CellValue + Ord> {
    cell: Rc<CellCore<BTreeSet<T>>>,
    op: SetOp,
    value: T,
}

impl<T: CellValue + Ord> SetChange<T> {
    fn apply(&self, present: bool) {
        let value = self.value.clone();
        self.cell.apply(|set| {
            if present {
                set.insert(value);
            } else {
                set.remove(&value);
            }
        });
    }
}

impl<T: CellValue + Ord> Change for SetChange<T> {
    fn execute(&self) {
        self.apply(self.op == SetOp::Add);
    }

    fn undo(&self) {
        self.apply(self.op == SetOp::Remove);
    }

    fn kind(&self) -> ChangeKind {
        match self.op {
            SetOp::Add => ChangeKind::SetAdd,
            SetOp::Remove => ChangeKind::SetRemove,
        }
    }

    fn target(&self) -> &CellId {
        self.cell.id()
    }

    fn describe(&self) -> String {
        let verb = match self.op {
            SetOp::Add => "add",
            SetOp::Remove => "remove",
        };
        format!("{}: {verb} {:?}", self.cell.id(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_membership_changes_record_nothing() {
        let manager = StateManager::default();
        let tags = SetState::new(&manager, "tags").unwrap();

        manager.stack().start("tags");
        assert!(tags.add("x"));
        assert!(!tags.add("x"));
        assert!(!tags.remove(&"y"));
        manager.stack().finish();

        assert_eq!(manager.stack().get(0).map(|set| set.len()), Some(1));
    }

    #[test]
    fn view_is_sorted() {
        let manager = StateManager::default();
        let tags = SetState::new(&manager, "tags").unwrap();

        manager.stack().start("fill");
        for tag in [3, 1, 2] {
            tags.add(tag);
        }
        manager.stack().finish();

        assert_eq!(tags.view(), vec![1, 2, 3]);
        manager.stack().undo();
        assert!(tags.is_empty());
    }
}
