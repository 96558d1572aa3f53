use std::fmt;
use std::rc::Rc;

use crate::cell::{CellId, CellValue, IntegerState, MapState};
use crate::error::StateError;
use crate::manager::StateManager;
use crate::observe::Observer;

/// Single countable quantity such as cash.
#[derive(Clone)]
pub struct Wallet {
    owner: String,
    balance: IntegerState,
}

impl Wallet {
    pub fn new(
        manager: &StateManager,
        id: impl Into<String>,
        owner: impl Into<String>,
        initial: i64,
    ) -> Result<Self, StateError> {
        Ok(Self {
            owner: owner.into(),
            balance: IntegerState::new(manager, id, initial)?,
        })
    }

    pub fn id(&self) -> &CellId {
        self.balance.id()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn value(&self) -> i64 {
        self.balance.value()
    }

    pub fn change(&self, delta: i64) -> bool {
        self.balance.add(delta)
    }

    /// Moves `amount` to `to` as two changes. A zero amount, a transfer to
    /// the same wallet, or one that would overflow either side records
    /// nothing.
    pub fn transfer(&self, amount: i64, to: &Wallet) -> bool {
        if amount == 0 || self.id() == to.id() {
            return false;
        }
        let fits = self.value().checked_sub(amount).is_some()
            && to.value().checked_add(amount).is_some();
        if !fits {
            tracing::warn!(
                amount,
                from = %self.owner,
                to = %to.owner,
                "wallet transfer overflows; refused"
            );
            return false;
        }
        self.change(-amount);
        to.change(amount);
        tracing::debug!(amount, from = %self.owner, to = %to.owner, "wallet transfer");
        true
    }

    /// The underlying cell, for binding and formatting.
    pub fn balance(&self) -> &IntegerState {
        &self.balance
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("owner", &self.owner)
            .field("value", &self.value())
            .finish()
    }
}

/// Sorted kind to count mapping of countable resources.
///
/// Only positive counts are stored: a change that would leave a negative
/// count is refused, a count reaching zero removes its entry, and undo brings
/// back an absent entry as absent.
pub struct WalletSet<K: CellValue + Ord> {
    owner: String,
    counts: MapState<K, i64>,
}

impl<K: CellValue + Ord> WalletSet<K> {
    pub fn new(
        manager: &StateManager,
        id: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Self, StateError> {
        Ok(Self {
            owner: owner.into(),
            counts: MapState::new(manager, id)?,
        })
    }

    pub fn id(&self) -> &CellId {
        self.counts.id()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Total count over all kinds, saturating at `i64::MAX`.
    pub fn value(&self) -> i64 {
        self.counts
            .fold(0_i64, |total, (_, count)| total.saturating_add(*count))
    }

    pub fn value_of(&self, kind: &K) -> i64 {
        self.counts.get(kind).unwrap_or(0)
    }

    /// Adjusts the count of `kind`. Returns `false` without recording when
    /// the delta is zero or the result would be negative or overflow.
    pub fn change(&self, kind: K, delta: i64) -> bool {
        if delta == 0 {
            return false;
        }
        let Some(count) = self.next_count(&kind, delta) else {
            return false;
        };
        if count == 0 {
            self.counts.remove(&kind).is_some()
        } else {
            self.counts.put(kind, count)
        }
    }

    /// Moves `amount` of `kind` to `to` as two changes, or records nothing
    /// when either side could not take its half.
    pub fn transfer(&self, kind: K, amount: i64, to: &WalletSet<K>) -> bool {
        if amount == 0 || self.id() == to.id() {
            return false;
        }
        let fits = amount
            .checked_neg()
            .and_then(|debit| self.next_count(&kind, debit))
            .is_some()
            && to.next_count(&kind, amount).is_some();
        if !fits {
            return false;
        }
        self.change(kind.clone(), -amount);
        to.change(kind, amount);
        true
    }

    fn next_count(&self, kind: &K, delta: i64) -> Option<i64> {
        let current = self.value_of(kind);
        let next = current.checked_add(delta).filter(|count| *count >= 0);
        if next.is_none() {
            tracing::warn!(
                wallet = %self.id(),
                kind = ?kind,
                current,
                delta,
                "count change refused"
            );
        }
        next
    }

    /// Kinds with their counts, in ascending kind order.
    pub fn view(&self) -> Vec<(K, i64)> {
        self.counts.view().into_iter().collect()
    }

    pub fn subscribe(&self, observer: Rc<dyn Observer>) {
        self.counts.subscribe(observer);
    }
}

impl<K: CellValue + Ord> Clone for WalletSet<K> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            counts: self.counts.clone(),
        }
    }
}

impl<K: CellValue + Ord> fmt::Debug for WalletSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSet")
            .field("owner", &self.owner)
            .field("counts", &self.view())
            .finish()
    }
}
