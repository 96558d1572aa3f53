use std::fmt;
use std::rc::Rc;

use super::{CellCore, CellId, CellKind, CellValue};
use crate::change::{Change, ChangeKind};
use crate::error::StateError;
use crate::manager::StateManager;
use crate::observe::{Model, Observer};

/// Ordered sequence cell. Every insert or removal records one change.
pub struct ListState<T: CellValue> {
    core: Rc<CellCore<Vec<T>>>,
}

impl<T: CellValue> ListState<T> {
    pub fn new(manager: &StateManager, id: impl Into<String>) -> Result<Self, StateError> {
        Self::with_items(manager, id, Vec::new())
    }

    pub fn with_items(
        manager: &StateManager,
        id: impl Into<String>,
        items: Vec<T>,
    ) -> Result<Self, StateError> {
        let core = CellCore::create(manager, id, CellKind::List, items)?;
        Ok(Self { core })
    }

    pub fn id(&self) -> &CellId {
        self.core.id()
    }

    /// Appends `value` at the end.
    pub fn add(&self, value: T) {
        let index = self.len();
        self.record(ListOp::Insert { index, value });
    }

    pub fn insert(&self, index: usize, value: T) -> Result<(), StateError> {
        let len = self.len();
        if index > len {
            return Err(self.out_of_bounds(index, len));
        }
        self.record(ListOp::Insert { index, value });
        Ok(())
    }

    /// Removes the first element equal to `value`; `false` if absent.
    pub fn remove(&self, value: &T) -> bool {
        match self.index_of(value) {
            Some(index) => {
                self.record(ListOp::Remove {
                    index,
                    value: value.clone(),
                });
                true
            }
            None => false,
        }
    }

    pub fn remove_at(&self, index: usize) -> Result<T, StateError> {
        let len = self.len();
        let value = self
            .get(index)
            .ok_or_else(|| self.out_of_bounds(index, len))?;
        self.record(ListOp::Remove {
            index,
            value: value.clone(),
        });
        Ok(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.core.read(|items| items.contains(value))
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.core
            .read(|items| items.iter().position(|item| item == value))
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.core.read(|items| items.get(index).cloned())
    }

    pub fn len(&self) -> usize {
        self.core.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.core.read(Vec::is_empty)
    }

    /// Snapshot of the current elements.
    pub fn view(&self) -> Vec<T> {
        self.core.read(Vec::clone)
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
    pub fn with_formatter(self, formatter: impl Fn(&Vec<T>) -> String + 'static) -> Self {
        self.core.set_formatter(Box::new(formatter));
        self
    }

    fn record(&self, op: ListOp<T>) {
        self.core.record(Box::new(ListChange {
            cell: Rc::clone(&self.core),
            op,
        }));
    }

    fn out_of_bounds(&self, index: usize, len: usize) -> StateError {
        StateError::IndexOutOfBounds {
            cell: self.id().clone(),
            index,
            len,
        }
    }
}

impl<T: CellValue> Clone for ListState<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: CellValue> fmt::Debug for ListState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core
            .read(|items| f.debug_tuple("ListState").field(self.id()).field(items).finish())
    }
}

#[derive(Debug)]
enum ListOp<T> {
    Insert { index: usize, value: T },
    Remove { index: usize, value: T },
}

struct ListChange<T: CellValue> {
    cell: Rc<CellCore<Vec<T>>>,
    op: ListOp<T>,
}

impl<T: CellValue> ListChange<T> {
    /// Inserts at `index`, clamped to the current length.
    fn insert(&self, index: usize, value: &T) {
        let value = value.clone();
        self.cell.apply(|items| {
            let at = index.min(items.len());
            items.insert(at, value);
        });
    }

    /// Removes `value`, preferring the recorded `index`. A list changed
    /// outside any change set may have moved or dropped the element.
    fn remove(&self, index: usize, value: &T) {
        self.cell.apply(|items| {
            let found = if items.get(index) == Some(value) {
                Some(index)
            } else {
                items.iter().position(|item| item == value)
            };
            match found {
                Some(at) => {
                    items.remove(at);
                }
                None => tracing::warn!(
                    cell = %self.cell.id(),
                    index,
                    "element to remove is gone; skipping"
                ),
            }
        });
    }
}

impl<T: CellValue> Change for ListChange<T> {
    fn execute(&self) {
        match &self.op {
            ListOp::Insert { index, value } => self.insert(*index, value),
            ListOp::Remove { index, value } => self.remove(*index, value),
        }
    }

    fn undo(&self) {
        match &self.op {
            ListOp::Insert { index, value } => self.remove(*index, value),
            ListOp::Remove { index, value } => self.insert(*index, value),
        }
    }

    fn kind(&self) -> ChangeKind {
        match self.op {
            ListOp::Insert { .. } => ChangeKind::ListInsert,
            ListOp::Remove { .. } => ChangeKind::ListRemove,
        }
    }

    fn target(&self) -> &CellId {
        self.cell.id()
    }

    fn describe(&self) -> String {
        match &self.op {
            ListOp::Insert { index, value } => {
                format!("{}: insert {value:?} at {index}", self.cell.id())
            }
            ListOp::Remove { index, value } => {
                format!("{}: remove {value:?} at {index}", self.cell.id())
            }
        }
    }
}
