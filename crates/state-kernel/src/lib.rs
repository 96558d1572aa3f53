//! Change-tracking state kernel for turn-based simulations.
//!
//! `state-kernel` turns typed values, collections and ownership relations into
//! undoable, redoable and observable state. Every mutation is expressed as a
//! [`Change`] that is applied immediately and recorded in the open
//! [`ChangeSet`]; committed sets form the linear history kept by the
//! [`ChangeStack`].
//!
//! Application code reads cells freely but mutates them only through their
//! methods (`set`, `add`, `put`, [`Ownable::move_to`], ...), which build the
//! corresponding change. Undo and redo reuse the very same apply path, so
//! observers see forward play and reversal identically.
//!
//! The kernel is single-threaded and synchronous. One [`StateManager`] owns
//! the history of one session; cells hold a weak reference to it, so several
//! sessions can coexist in one process.
pub mod cell;
pub mod change;
pub mod config;
pub mod error;
pub mod manager;
pub mod observe;
pub mod owner;
pub mod stack;

pub use cell::{
    BooleanState, CellId, CellKind, CellValue, IntegerState, ListState, MapState, SetState,
    StateCell,
};
pub use change::{Change, ChangeKind, ChangeSet};
pub use config::KernelConfig;
pub use error::{ErrorSeverity, KernelError, ProtocolViolation, StateError};
pub use manager::StateManager;
pub use observe::{Model, Observer};
pub use owner::{Holder, Ownable, OwnableItem, Portfolio, Wallet, WalletSet};
pub use stack::{ChangeReporter, ChangeStack};
