//! Display-facing notification.
//!
//! Cells notify [`Observer`]s with their rendered text and call
//! [`Model::update`] on bound models every time a change applies, whether
//! during forward play, cancellation, undo or redo. Models form a
//! caller-managed dependency graph; `update` cascades to dependents.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Receiver of rendered text.
pub trait Observer {
    fn notify(&self, text: &str);
}

impl<F> Observer for F
where
    F: Fn(&str),
{
    fn notify(&self, text: &str) {
        self(text)
    }
}

/// Aggregate view recomputed from one or more cells.
pub struct Model {
    name: String,
    render: Box<dyn Fn() -> String>,
    text: RefCell<String>,
    observers: RefCell<Vec<Rc<dyn Observer>>>,
    dependents: RefCell<Vec<Weak<Model>>>,
}

impl Model {
    /// `render` is evaluated once now and again on every update.
    pub fn new(name: impl Into<String>, render: impl Fn() -> String + 'static) -> Rc<Self> {
        let text = render();
        Rc::new(Self {
            name: name.into(),
            render: Box::new(render),
            text: RefCell::new(text),
            observers: RefCell::new(Vec::new()),
            dependents: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text computed by the last update.
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn add_observer(&self, observer: Rc<dyn Observer>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Registers `dependent` to be updated after this model.
    ///
    /// The graph must stay acyclic; debug builds assert it.
    pub fn add_dependent(&self, dependent: &Rc<Model>) {
        debug_assert!(
            !dependent.reaches(self),
            "model dependency {} -> {} closes a cycle",
            self.name,
            dependent.name
        );
        self.dependents.borrow_mut().push(Rc::downgrade(dependent));
    }

    /// Recomputes the text, notifies observers, then updates dependents.
    pub fn update(&self) {
        let text = (self.render)();
        *self.text.borrow_mut() = text.clone();
        tracing::trace!(model = %self.name, "model updated");

        let observers = self.observers.borrow().clone();
        for observer in &observers {
            observer.notify(&text);
        }
        let dependents = self.dependents.borrow().clone();
        for dependent in dependents.iter().filter_map(Weak::upgrade) {
            dependent.update();
        }
    }

    fn reaches(&self, target: &Model) -> bool {
        if std::ptr::eq(self, target) {
            return true;
        }
        self.dependents
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .any(|dependent| dependent.reaches(target))
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("text", &*self.text.borrow())
            .finish()
    }
}
