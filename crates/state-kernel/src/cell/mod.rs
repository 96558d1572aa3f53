//! Typed, undoable value holders.
//!
//! Every cell family shares one private core: an identity, the current value,
//! an optional notification binding and a weak link to the session's
//! [`ChangeStack`](crate::ChangeStack). Changes reach the value only through
//! [`CellCore::apply`], which is also where subscribers are notified.
mod list;
mod map;
mod scalar;
mod set;

pub use list::ListState;
pub use map::MapState;
pub use scalar::{BooleanState, IntegerState, StateCell};
pub use set::SetState;

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::change::Change;
use crate::error::StateError;
use crate::manager::StateManager;
use crate::observe::{Model, Observer};
use crate::stack::WeakStack;

/// Values a cell can hold.
pub trait CellValue: Clone + PartialEq + fmt::Debug + 'static {}

impl<T> CellValue for T where T: Clone + PartialEq + fmt::Debug + 'static {}

/// Identity of a cell, unique among the live cells of one [`StateManager`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellId(String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CellId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shape of the value a cell holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    Scalar,
    List,
    Set,
    Map,
    Portfolio,
}

pub(crate) type Formatter<V> = Box<dyn Fn(&V) -> String>;

/// Subscribers of one cell. Allocated on first subscription only.
struct Bindings {
    observers: Vec<Rc<dyn Observer>>,
    models: Vec<Weak<Model>>,
}

pub(crate) struct CellCore<V> {
    id: CellId,
    kind: CellKind,
    value: RefCell<V>,
    formatter: RefCell<Option<Formatter<V>>>,
    bindings: RefCell<Option<Box<Bindings>>>,
    stack: WeakStack,
}

impl<V: CellValue> CellCore<V> {
    /// Claims `id` in the manager's registry and builds the core.
    pub(crate) fn create(
        manager: &StateManager,
        id: impl Into<String>,
        kind: CellKind,
        value: V,
    ) -> Result<Rc<Self>, StateError> {
        let id = manager.claim(id.into())?;
        let core = Rc::new(Self {
            id,
            kind,
            value: RefCell::new(value),
            formatter: RefCell::new(None),
            bindings: RefCell::new(None),
            stack: manager.stack().downgrade(),
        });
        manager.register(Rc::clone(&core) as Rc<dyn Registered>);
        Ok(core)
    }

    pub(crate) fn id(&self) -> &CellId {
        &self.id
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.value.borrow())
    }

    /// The single mutation entry point shared by every change.
    pub(crate) fn apply(&self, f: impl FnOnce(&mut V)) {
        f(&mut self.value.borrow_mut());
        self.publish();
    }

    /// Executes `change` and records it with the session's history.
    pub(crate) fn record(&self, change: Box<dyn Change>) {
        self.stack.record(change);
    }

    pub(crate) fn render(&self) -> String {
        let formatter = self.formatter.borrow();
        let value = self.value.borrow();
        match formatter.as_ref() {
            Some(format) => format(&value),
            None => format!("{:?}", *value),
        }
    }

    pub(crate) fn set_formatter(&self, formatter: Formatter<V>) {
        *self.formatter.borrow_mut() = Some(formatter);
    }

    pub(crate) fn subscribe(&self, observer: Rc<dyn Observer>) {
        self.bindings_mut(|bindings| bindings.observers.push(observer));
    }

    pub(crate) fn add_model(&self, model: &Rc<Model>) {
        let model = Rc::downgrade(model);
        self.bindings_mut(|bindings| bindings.models.push(model));
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.bindings
            .borrow()
            .as_ref()
            .map_or(0, |bindings| bindings.observers.len())
    }

    fn bindings_mut(&self, f: impl FnOnce(&mut Bindings)) {
        let mut bindings = self.bindings.borrow_mut();
        let bindings = bindings.get_or_insert_with(|| {
            Box::new(Bindings {
                observers: Vec::new(),
                models: Vec::new(),
            })
        });
        f(bindings);
    }

    /// Notifies observers with the rendered value, then updates bound models.
    ///
    /// Subscribers are collected before any callback runs, so callbacks may
    /// read this cell or subscribe further.
    fn publish(&self) {
        let (observers, models) = {
            let bindings = self.bindings.borrow();
            let Some(bindings) = bindings.as_ref() else {
                return;
            };
            (bindings.observers.clone(), bindings.models.clone())
        };

        if !observers.is_empty() {
            let text = self.render();
            for observer in &observers {
                observer.notify(&text);
            }
        }
        for model in models.iter().filter_map(Weak::upgrade) {
            model.update();
        }
    }
}

/// Type-erased view of a live cell, kept by the manager's registry.
pub(crate) trait Registered {
    fn id(&self) -> &CellId;

    fn kind(&self) -> CellKind;

    fn value_type(&self) -> &'static str;

    fn render(&self) -> String;

    /// Assigns a whole new value; only scalar cells accept it.
    fn assign(self: Rc<Self>, value: Box<dyn Any>, found: &'static str)
    -> Result<bool, StateError>;
}

impl<V: CellValue> Registered for CellCore<V> {
    fn id(&self) -> &CellId {
        &self.id
    }

    fn kind(&self) -> CellKind {
        self.kind
    }

    fn value_type(&self) -> &'static str {
        std::any::type_name::<V>()
    }

    fn render(&self) -> String {
        CellCore::render(self)
    }

    fn assign(
        self: Rc<Self>,
        value: Box<dyn Any>,
        found: &'static str,
    ) -> Result<bool, StateError> {
        if self.kind != CellKind::Scalar {
            return Err(StateError::NotAssignable {
                cell: self.id.clone(),
            });
        }
        let value = value
            .downcast::<V>()
            .map_err(|_| StateError::TypeMismatch {
                cell: self.id.clone(),
                expected: std::any::type_name::<V>(),
                found,
            })?;
        Ok(StateCell::from_core(self).set(*value))
    }
}
