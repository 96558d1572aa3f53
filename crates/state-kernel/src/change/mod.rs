//! Reversible mutation records.
//!
//! A [`Change`] captures the pre-mutation value of its target at construction
//! time. `execute` installs the new value through the target's single apply
//! entry point, `undo` reinstalls the captured one through the same entry
//! point. Concrete changes live next to the cell family they mutate.
mod set;

pub use set::ChangeSet;

use crate::cell::CellId;

/// Tag identifying the concrete variant of a [`Change`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    /// Scalar value replaced.
    Replace,
    /// Map entry inserted or overwritten.
    MapPut,
    /// Map entry removed.
    MapRemove,
    /// Element added to a set.
    SetAdd,
    /// Element removed from a set.
    SetRemove,
    /// Element inserted into a sequence at an index.
    ListInsert,
    /// Element removed from a sequence at an index.
    ListRemove,
    /// Ownable item entering or leaving a portfolio.
    Transfer,
}

/// Atomic, reversible mutation of one cell.
///
/// Implementations must guarantee that `undo` after `execute` restores the
/// exact observable pre-execute state, including the difference between an
/// entry that did not exist and one that existed with some value.
pub trait Change {
    /// Applies the new value to the target.
    fn execute(&self);

    /// Reapplies the captured old value to the target.
    fn undo(&self);

    fn kind(&self) -> ChangeKind;

    /// The cell this change mutates.
    fn target(&self) -> &CellId;

    /// Human-readable one-line description, used by report logs.
    fn describe(&self) -> String;
}

impl core::fmt::Debug for dyn Change {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}({})", self.kind(), self.describe())
    }
}
