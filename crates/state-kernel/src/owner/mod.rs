//! Containers whose items have exactly one holder.
//!
//! A transfer between portfolios is two changes recorded into the open set,
//! a removal from the source followed by an insertion into the destination,
//! so undo reverses it as a unit. The holder back-reference is updated by the
//! same changes, inside the cell's apply step.
mod wallet;

pub use wallet::{Wallet, WalletSet};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::cell::{CellCore, CellId, CellKind};
use crate::change::{Change, ChangeKind};
use crate::error::StateError;
use crate::manager::StateManager;
use crate::observe::{Model, Observer};

/// Back-reference from an item to the portfolio currently holding it.
pub struct Holder<T> {
    slot: RefCell<Weak<PortfolioInner<T>>>,
}

impl<T: Ownable> Holder<T> {
    pub fn new() -> Self {
        Self {
            slot: RefCell::new(Weak::new()),
        }
    }

    pub fn portfolio(&self) -> Option<Portfolio<T>> {
        self.inner().map(|inner| Portfolio { inner })
    }

    fn inner(&self) -> Option<Rc<PortfolioInner<T>>> {
        self.slot.borrow().upgrade()
    }

    fn set(&self, portfolio: &Rc<PortfolioInner<T>>) {
        *self.slot.borrow_mut() = Rc::downgrade(portfolio);
    }

    fn clear(&self) {
        *self.slot.borrow_mut() = Weak::new();
    }
}

impl<T: Ownable> Default for Holder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ownable> fmt::Debug for Holder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.inner().map(|inner| inner.owner.clone());
        f.debug_tuple("Holder").field(&owner).finish()
    }
}

/// An item with exactly one current portfolio.
///
/// Clones of an item must share one [`Holder`], typically by wrapping the
/// item's state in an `Rc` as [`OwnableItem`] does.
pub trait Ownable: Clone + PartialEq + fmt::Debug + 'static {
    /// Identity used for containment checks and rendering.
    fn id(&self) -> &str;

    fn holder(&self) -> &Holder<Self>;

    fn owner(&self) -> Option<Portfolio<Self>> {
        self.holder().portfolio()
    }

    /// Moves the item into `to`; `false` if it is already there.
    fn move_to(&self, to: &Portfolio<Self>) -> bool {
        to.move_in(self)
    }
}

struct PortfolioInner<T> {
    owner: String,
    core: Rc<CellCore<Vec<T>>>,
}

/// Ordered collection of ownable items belonging to one owner.
pub struct Portfolio<T: Ownable> {
    inner: Rc<PortfolioInner<T>>,
}

impl<T: Ownable> Portfolio<T> {
    pub fn new(
        manager: &StateManager,
        id: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Self, StateError> {
        let core = CellCore::create(manager, id, CellKind::Portfolio, Vec::new())?;
        core.set_formatter(Box::new(|items: &Vec<T>| {
            items.iter().map(Ownable::id).collect::<Vec<_>>().join(", ")
        }));
        Ok(Self {
            inner: Rc::new(PortfolioInner {
                owner: owner.into(),
                core,
            }),
        })
    }

    pub fn id(&self) -> &CellId {
        self.inner.core.id()
    }

    pub fn owner(&self) -> &str {
        &self.inner.owner
    }

    /// Takes `item` from its current holder, if any, and appends it here.
    pub fn move_in(&self, item: &T) -> bool {
        let source = item.holder().inner();
        if let Some(source) = &source {
            if Rc::ptr_eq(source, &self.inner) {
                return false;
            }
            match position(source, item) {
                Some(index) => record(source, item, index, false),
                None => tracing::warn!(
                    item = item.id(),
                    holder = %source.core.id(),
                    "holder does not list the item; recording the insertion only"
                ),
            }
        }
        record(&self.inner, item, self.len(), true);
        tracing::debug!(
            item = item.id(),
            from = source.as_ref().map(|s| s.owner.as_str()),
            to = %self.inner.owner,
            "ownership transferred"
        );
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        position(&self.inner, item).is_some()
    }

    pub fn items(&self) -> Vec<T> {
        self.inner.core.read(Vec::clone)
    }

    pub fn len(&self) -> usize {
        self.inner.core.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.core.read(Vec::is_empty)
    }

    pub fn subscribe(&self, observer: Rc<dyn Observer>) {
        self.inner.core.subscribe(observer);
    }

    pub fn add_model(&self, model: &Rc<Model>) {
        self.inner.core.add_model(model);
    }

    /// Item ids joined by commas.
    pub fn render(&self) -> String {
        self.inner.core.render()
    }
}

fn position<T: Ownable>(portfolio: &PortfolioInner<T>, item: &T) -> Option<usize> {
    portfolio
        .core
        .read(|items| items.iter().position(|held| held.id() == item.id()))
}

fn record<T: Ownable>(portfolio: &Rc<PortfolioInner<T>>, item: &T, index: usize, into: bool) {
    portfolio.core.record(Box::new(PortfolioChange {
        portfolio: Rc::clone(portfolio),
        item: item.clone(),
        index,
        into,
    }));
}

impl<T: Ownable> Clone for Portfolio<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Ownable> PartialEq for Portfolio<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Ownable> fmt::Debug for Portfolio<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portfolio")
            .field("id", self.id())
            .field("owner", &self.inner.owner)
            .field("items", &self.render())
            .finish()
    }
}

/// One half of a transfer: `into` inserts the item at `index`, otherwise
/// removes it from there. Undo applies the opposite direction.
struct PortfolioChange<T: Ownable> {
    portfolio: Rc<PortfolioInner<T>>,
    item: T,
    index: usize,
    into: bool,
}

impl<T: Ownable> PortfolioChange<T> {
    fn apply(&self, into: bool) {
        self.portfolio.core.apply(|items| {
            if into {
                self.insert(items);
            } else {
                self.remove(items);
            }
        });
    }

    /// Places the item at the recorded index, clamped to the current length.
    /// An item still listed by another portfolio stays where it is.
    fn insert(&self, items: &mut Vec<T>) {
        if let Some(holder) = self.item.holder().inner() {
            if !Rc::ptr_eq(&holder, &self.portfolio) && position(&holder, &self.item).is_some() {
                tracing::warn!(
                    item = self.item.id(),
                    holder = %holder.core.id(),
                    target = %self.portfolio.core.id(),
                    "item is held elsewhere; skipping insertion"
                );
                return;
            }
        }
        if !items.iter().any(|held| held.id() == self.item.id()) {
            let at = self.index.min(items.len());
            items.insert(at, self.item.clone());
        }
        self.item.holder().set(&self.portfolio);
    }

    /// Removes the item, preferring the recorded index. Unrecorded moves may
    /// have shifted or taken it.
    fn remove(&self, items: &mut Vec<T>) {
        let matches = |held: &T| held.id() == self.item.id();
        let found = if items.get(self.index).is_some_and(matches) {
            Some(self.index)
        } else {
            items.iter().position(matches)
        };
        let Some(at) = found else {
            tracing::warn!(
                item = self.item.id(),
                portfolio = %self.portfolio.core.id(),
                "item to remove is gone; skipping"
            );
            return;
        };
        items.remove(at);
        let held_here = self
            .item
            .holder()
            .inner()
            .is_some_and(|holder| Rc::ptr_eq(&holder, &self.portfolio));
        if held_here {
            self.item.holder().clear();
        }
    }
}

impl<T: Ownable> Change for PortfolioChange<T> {
    fn execute(&self) {
        self.apply(self.into);
    }

    fn undo(&self) {
        self.apply(!self.into);
    }

    fn kind(&self) -> ChangeKind {
        ChangeKind::Transfer
    }

    fn target(&self) -> &CellId {
        self.portfolio.core.id()
    }

    fn describe(&self) -> String {
        let direction = if self.into { "to" } else { "from" };
        format!(
            "{} moved {direction} {}",
            self.item.id(),
            self.portfolio.owner
        )
    }
}

struct ItemInner {
    id: String,
    holder: Holder<OwnableItem>,
}

/// Ready-made ownable handle: an id plus a shared holder.
#[derive(Clone)]
pub struct OwnableItem {
    inner: Rc<ItemInner>,
}

impl OwnableItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ItemInner {
                id: id.into(),
                holder: Holder::new(),
            }),
        }
    }
}

impl Ownable for OwnableItem {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn holder(&self) -> &Holder<Self> {
        &self.inner.holder
    }
}

impl PartialEq for OwnableItem {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl fmt::Debug for OwnableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnableItem").field(&self.inner.id).finish()
    }
}
