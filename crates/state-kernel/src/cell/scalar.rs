use std::fmt;
use std::rc::Rc;

use super::{CellCore, CellId, CellKind, CellValue};
use crate::change::{Change, ChangeKind};
use crate::error::StateError;
use crate::manager::StateManager;
use crate::observe::{Model, Observer};

/// Single-valued undoable cell.
pub struct StateCell<T: CellValue> {
    core: Rc<CellCore<T>>,
}

pub type BooleanState = StateCell<bool>;
pub type IntegerState = StateCell<i64>;

impl<T: CellValue> StateCell<T> {
    pub fn new(manager: &StateManager, id: impl Into<String>, value: T) -> Result<Self, StateError> {
        let core = CellCore::create(manager, id, CellKind::Scalar, value)?;
        Ok(Self { core })
    }

    pub(crate) fn from_core(core: Rc<CellCore<T>>) -> Self {
        Self { core }
    }

    pub fn id(&self) -> &CellId {
        self.core.id()
    }

    pub fn value(&self) -> T {
        self.core.read(T::clone)
    }

    /// Borrows the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.core.read(f)
    }

    /// Replaces the value, recording one change.
    ///
    /// Returns `false` and records nothing when `value` equals the current one.
    pub fn set(&self, value: T) -> bool {
        if self.core.read(|current| *current == value) {
            return false;
        }
        self.replace(value);
        true
    }

    /// Replaces the value even when unchanged, so subscribers are notified.
    pub fn set_forced(&self, value: T) {
        self.replace(value);
    }

    fn replace(&self, new: T) {
        let old = self.value();
        self.core.record(Box::new(ReplaceChange {
            cell: Rc::clone(&self.core),
            old,
            new,
        }));
    }

    pub fn subscribe(&self, observer: Rc<dyn Observer>) {
        self.core.subscribe(observer);
    }

    pub fn add_model(&self, model: &Rc<Model>) {
        self.core.add_model(model);
    }

    pub fn observer_count(&self) -> usize {
        self.core.observer_count()
    }

    /// Text handed to subscribers.
    pub fn render(&self) -> String {
        self.core.render()
    }

    #[must_use]
    pub fn with_formatter(self, formatter: impl Fn(&T) -> String + 'static) -> Self {
        self.core.set_formatter(Box::new(formatter));
        self
    }
}

impl StateCell<i64> {
    /// Adds `delta` to the value; a zero delta records nothing.
    ///
    /// A sum that overflows is refused and leaves the value unchanged.
    pub fn add(&self, delta: i64) -> bool {
        let current = self.value();
        match current.checked_add(delta) {
            Some(next) => self.set(next),
            None => {
                tracing::warn!(
                    cell = %self.id(),
                    current,
                    delta,
                    "integer add overflows; refused"
                );
                false
            }
        }
    }
}

impl<T: CellValue> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: CellValue> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core
            .read(|value| f.debug_tuple("StateCell").field(self.id()).field(value).finish())
    }
}

struct ReplaceChange<T: CellValue> {
    cell: Rc<CellCore<T>>,
    old: T,
    new: T,
}

impl<T: CellValue> Change for ReplaceChange<T> {
    fn execute(&self) {
        let new = self.new.clone();
        self.cell.apply(|value| *value = new);
    }

    fn undo(&self) {
        let old = self.old.clone();
        self.cell.apply(|value| *value = old);
    }

    fn kind(&self) -> ChangeKind {
        ChangeKind::Replace
    }

    fn target(&self) -> &CellId {
        self.cell.id()
    }

    fn describe(&self) -> String {
        format!("{}: {:?} -> {:?}", self.cell.id(), self.old, self.new)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn equal_value_records_nothing() {
        let manager = StateManager::default();
        let flag = BooleanState::new(&manager, "flag", false).unwrap();

        manager.stack().start("noop");
        assert!(!flag.set(false));
        assert_eq!(manager.stack().open_len(), Some(0));
        assert!(flag.set(true));
        assert_eq!(manager.stack().open_len(), Some(1));
        manager.stack().finish();
    }

    #[test]
    fn forced_set_notifies_on_equal_value() {
        let manager = StateManager::default();
        let price = IntegerState::new(&manager, "price", 40).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        price.subscribe(Rc::new(move |text: &str| sink.borrow_mut().push(text.to_string())));

        manager.stack().start("reset");
        price.set_forced(40);
        manager.stack().finish();

        assert_eq!(*seen.borrow(), vec!["40"]);
        assert_eq!(manager.stack().get(0).map(|set| set.len()), Some(1));
    }

    #[test]
    fn integer_add_and_formatter() {
        let manager = StateManager::default();
        let cash = IntegerState::new(&manager, "cash", 100)
            .unwrap()
            .with_formatter(|value| format!("${value}"));

        manager.stack().start("income");
        assert!(cash.add(25));
        assert!(!cash.add(0));
        manager.stack().finish();

        assert_eq!(cash.value(), 125);
        assert_eq!(cash.render(), "$125");
        assert_eq!(
            manager.stack().get(0).unwrap().descriptions(),
            vec!["cash: 100 -> 125"]
        );
    }

    #[test]
    fn unattached_mutation_applies_but_is_counted() {
        let manager = StateManager::default();
        let cash = IntegerState::new(&manager, "cash", 1).unwrap();

        assert!(cash.set(2));
        assert_eq!(cash.value(), 2);
        assert_eq!(manager.stack().unattached_count(), 1);
        assert!(!manager.stack().is_undoable());
    }

    #[test]
    fn overflowing_add_is_refused() {
        let manager = StateManager::default();
        let counter = IntegerState::new(&manager, "counter", i64::MAX).unwrap();

        manager.stack().start("overflow");
        assert!(!counter.add(1));
        assert!(counter.add(-1));
        manager.stack().finish();

        assert_eq!(counter.value(), i64::MAX - 1);
        assert_eq!(manager.stack().get(0).map(|set| set.len()), Some(1));
    }
}
