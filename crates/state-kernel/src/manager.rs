//! Session-scoped owner of the change stack and the cell registry.
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::cell::{CellId, CellKind, Registered};
use crate::config::KernelConfig;
use crate::error::{KernelError, StateError};
use crate::stack::ChangeStack;

/// Owns one session's [`ChangeStack`] and knows every live cell by name.
///
/// The registry holds weak references only; dropping a cell frees its id.
pub struct StateManager {
    stack: ChangeStack,
    cells: RefCell<BTreeMap<CellId, Weak<dyn Registered>>>,
}

impl StateManager {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            stack: ChangeStack::new(config),
            cells: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn stack(&self) -> &ChangeStack {
        &self.stack
    }

    pub fn config(&self) -> KernelConfig {
        self.stack.config()
    }

    /// Validates a new cell id. Ids of dropped cells may be reused.
    pub(crate) fn claim(&self, id: String) -> Result<CellId, StateError> {
        if id.trim().is_empty() {
            return Err(self.refuse(id, "empty identifier"));
        }
        let id = CellId::new(id);
        let live = self
            .cells
            .borrow()
            .get(&id)
            .is_some_and(|cell| cell.strong_count() > 0);
        if live {
            return Err(self.refuse(id.as_str().to_string(), "identifier already in use"));
        }
        Ok(id)
    }

    pub(crate) fn register(&self, cell: Rc<dyn Registered>) {
        let id = cell.id().clone();
        tracing::trace!(
            cell = %id,
            kind = %cell.kind(),
            value = cell.value_type(),
            "cell registered"
        );
        self.cells.borrow_mut().insert(id, Rc::downgrade(&cell));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// Ids of all live cells, sorted.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells
            .borrow()
            .iter()
            .filter(|(_, cell)| cell.strong_count() > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn kind_of(&self, id: &str) -> Option<CellKind> {
        self.lookup(id).map(|cell| cell.kind())
    }

    /// Current text of any live cell, as its subscribers would see it.
    pub fn render(&self, id: &str) -> Option<String> {
        self.lookup(id).map(|cell| cell.render())
    }

    /// Assigns `value` to the scalar cell named `id`.
    ///
    /// The value is refused and the prior value retained when the cell is
    /// unknown, is a collection, or holds a different type. Returns whether
    /// the value changed.
    pub fn set_dynamic<T: Any>(&self, id: &str, value: T) -> Result<bool, StateError> {
        let found = std::any::type_name::<T>();
        let result = match self.lookup(id) {
            Some(cell) => cell.assign(Box::new(value), found),
            None => Err(StateError::UnknownCell {
                cell: id.to_string(),
            }),
        };
        if let Err(err) = &result {
            tracing::warn!(code = err.error_code(), "{err}");
        }
        result
    }

    fn lookup(&self, id: &str) -> Option<Rc<dyn Registered>> {
        self.cells
            .borrow()
            .get(&CellId::new(id))
            .and_then(Weak::upgrade)
    }

    fn refuse(&self, cell: String, reason: &'static str) -> StateError {
        let err = StateError::Configuration { cell, reason };
        tracing::warn!(code = err.error_code(), "{err}");
        err
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("stack", &self.stack)
            .field("cells", &self.cell_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{IntegerState, ListState, StateCell};

    #[test]
    fn rejects_empty_and_duplicate_ids() {
        let manager = StateManager::default();
        let _cash = IntegerState::new(&manager, "cash", 0).unwrap();

        let dup = IntegerState::new(&manager, "cash", 1).unwrap_err();
        assert_eq!(dup.error_code(), "KERNEL_CONFIGURATION");
        assert!(IntegerState::new(&manager, "  ", 1).is_err());
    }

    #[test]
    fn dropped_cell_frees_its_id() {
        let manager = StateManager::default();
        drop(IntegerState::new(&manager, "temp", 0).unwrap());

        assert!(!manager.contains("temp"));
        assert!(IntegerState::new(&manager, "temp", 3).is_ok());
        assert_eq!(manager.render("temp").as_deref(), Some("3"));
    }

    #[test]
    fn dynamic_assignment_checks_type_and_kind() {
        let manager = StateManager::default();
        let cash = IntegerState::new(&manager, "cash", 10).unwrap();
        let _name = StateCell::new(&manager, "name", String::from("PRR")).unwrap();
        let _list = ListState::<i64>::new(&manager, "list").unwrap();

        manager.stack().start("dynamic");
        assert_eq!(manager.set_dynamic("cash", 20_i64), Ok(true));
        let err = manager.set_dynamic("cash", "twenty").unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { .. }));
        assert!(matches!(
            manager.set_dynamic("list", 1_i64).unwrap_err(),
            StateError::NotAssignable { .. }
        ));
        assert!(matches!(
            manager.set_dynamic("missing", 1_i64).unwrap_err(),
            StateError::UnknownCell { .. }
        ));
        manager.stack().finish();

        assert_eq!(cash.value(), 20);
        assert_eq!(manager.kind_of("list"), Some(CellKind::List));
        assert_eq!(manager.cell_ids().len(), 3);
    }
}
