//! Persistence of session action logs.
//!
//! A save holds what is needed to rebuild a session deterministically: the
//! initial configuration and the ordered list of committed actions. State
//! itself is never stored, only a checksum of it.

mod error;
mod log;
mod save;

pub use error::{RepositoryError, Result};
pub use log::{FrameLog, FrameReader};
pub use save::{FORMAT_VERSION, LogEntry, SaveFile, SaveHeader, SaveRecord, read, write};
