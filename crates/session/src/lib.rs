//! Session layer over the state kernel.
//!
//! A [`Session`] owns one [`StateManager`](state_kernel::StateManager) and a
//! [`Game`] built against it. It runs every player action inside its own
//! change set, mirrors undo and redo onto the action log, writes the
//! human-readable [`ReportLog`], and persists the log so a session can be
//! rebuilt by deterministic replay.
//!
//! # Persistence
//!
//! A save file holds the initial configuration, the committed actions and
//! any trailing annotations, followed by a SHA-256 checksum of the resulting
//! state. Loading rebuilds the game from the configuration, replays every
//! action and compares checksums.
pub mod config;
pub mod error;
pub mod game;
pub mod hash;
pub mod report;
pub mod repository;
pub mod session;

pub use config::SessionConfig;
pub use error::{ReplayFailure, SessionError};
pub use game::Game;
pub use report::ReportLog;
pub use repository::{LogEntry, RepositoryError};
pub use session::Session;
