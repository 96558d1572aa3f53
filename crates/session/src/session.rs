//! Top-level session: one game, one history, one action log.
use std::path::Path;
use std::rc::Rc;

use serde::Serialize;
use state_kernel::{KernelError, ProtocolViolation, StateManager};

use crate::config::SessionConfig;
use crate::error::{ReplayFailure, SessionError};
use crate::game::Game;
use crate::hash;
use crate::report::ReportLog;
use crate::repository::{self, FORMAT_VERSION, LogEntry, SaveFile, SaveHeader};

/// Label of the change set the initial state is built in.
const INITIALISE: &str = "initialise";

/// Drives a [`Game`] through the kernel.
///
/// Every action runs inside its own change set. The committed change sets on
/// the stack correspond one to one, in order, to the actions logged after the
/// last barrier, which is what keeps undo, redo and the saved action log in
/// step.
pub struct Session<G: Game> {
    config: SessionConfig,
    game_config: G::Config,
    manager: StateManager,
    game: G,
    applied: Vec<LogEntry<G::Action>>,
    /// Undone actions, most recently undone last.
    undone: Vec<G::Action>,
    annotations: Vec<String>,
    report: Rc<ReportLog>,
}

#[derive(Serialize)]
struct SessionSummary<'a, S> {
    session_id: &'a str,
    applied_actions: usize,
    undoable: bool,
    redoable: bool,
    state_hash: String,
    annotations: &'a [String],
    snapshot: S,
}

impl<G: Game> Session<G> {
    /// Builds the initial state. It is committed and then cleared, so the
    /// initial state can never be undone.
    pub fn new(config: SessionConfig, game_config: G::Config) -> Result<Self, SessionError> {
        let manager = StateManager::new(config.kernel);
        let stack = manager.stack();

        stack.start(INITIALISE);
        let game = match G::build(&game_config, &manager) {
            Ok(game) => game,
            Err(err) => {
                stack.cancel();
                tracing::warn!(session = %config.session_id, error = %err, "game build failed");
                return Err(SessionError::Build(Box::new(err)));
            }
        };
        stack.clear();

        let report = Rc::new(ReportLog::new());
        stack.set_reporter(report.clone());

        let session = Self {
            config,
            game_config,
            manager,
            game,
            applied: Vec::new(),
            undone: Vec::new(),
            annotations: Vec::new(),
            report,
        };
        tracing::info!(
            session = %session.config.session_id,
            cells = session.manager.cell_ids().len(),
            "session started"
        );
        Ok(session)
    }

    /// Runs `action` as one undoable change set.
    ///
    /// A rejected action is cancelled, leaving no trace in state or history.
    pub fn process(&mut self, action: G::Action) -> Result<(), SessionError> {
        let step = self.action_count() + 1;
        let label = G::label(&action);
        let stack = self.manager.stack();

        if !stack.start(label.clone()) {
            let violation = stack
                .last_violation()
                .unwrap_or(ProtocolViolation::AlreadyOpen);
            return Err(SessionError::Protocol(violation));
        }

        if let Err(err) = self.game.process(&action) {
            if stack.is_open() {
                stack.cancel();
            }
            tracing::warn!(step, label = %label, error = %err, "action rejected");
            return Err(SessionError::ActionRejected {
                step,
                label,
                source: Box::new(err),
            });
        }

        if stack.is_open() {
            stack.finish();
        }
        self.applied.push(LogEntry::Action(action));
        self.undone.clear();
        tracing::debug!(step, label = %label, "action committed");

        if self.config.autosave {
            self.autosave()?;
        }
        Ok(())
    }

    /// Undoes the last action; `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.manager.stack().undo() {
            return false;
        }
        match self.applied.pop() {
            Some(LogEntry::Action(action)) => self.undone.push(action),
            other => {
                // the stack is cleared at every barrier, so it never undoes past one
                debug_assert!(false, "undo crossed a barrier: {other:?}");
            }
        }
        true
    }

    /// Redoes the last undone action; `false` when there is none.
    pub fn redo(&mut self) -> bool {
        if !self.manager.stack().redo() {
            return false;
        }
        if let Some(action) = self.undone.pop() {
            self.applied.push(LogEntry::Action(action));
        }
        true
    }

    pub fn is_undoable(&self) -> bool {
        self.manager.stack().is_undoable()
    }

    pub fn is_redoable(&self) -> bool {
        self.manager.stack().is_redoable()
    }

    /// Makes everything so far irreversible while keeping it in the log.
    pub fn barrier(&mut self) {
        self.manager.stack().clear();
        self.applied.push(LogEntry::Barrier);
        self.undone.clear();
        tracing::info!(session = %self.config.session_id, steps = self.action_count(), "barrier");
    }

    /// Appends a free-text note to the report and the saved annotations.
    pub fn annotate(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.report.annotate(text.clone());
        self.annotations.push(text);
    }

    /// Hex SHA-256 of the game snapshot.
    pub fn state_hash(&self) -> Result<String, SessionError> {
        hash::state_hash(&self.game.snapshot())
    }

    /// Writes the configuration, applied actions and annotations to `path`.
    ///
    /// Undone actions are not persisted.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        let save = SaveFile {
            header: SaveHeader {
                format_version: FORMAT_VERSION,
                session_id: self.config.session_id.clone(),
                config: self.game_config.clone(),
            },
            entries: self.applied.clone(),
            annotations: self.annotations.clone(),
            checksum: self.state_hash()?,
        };
        repository::write(path, &save)?;
        tracing::info!(
            session = %self.config.session_id,
            path = %path.display(),
            hash = hash::short(&save.checksum),
            "session saved"
        );
        Ok(())
    }

    /// Rebuilds a session from `path` by replaying its action log.
    ///
    /// The saved session id replaces the one in `config`.
    pub fn load(path: impl AsRef<Path>, mut config: SessionConfig) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let save = repository::read::<G::Config, G::Action>(path)?;
        config.session_id = save.header.session_id.clone();
        let verify = config.verify_checksum;

        let session = Self::rebuild(config, save.header.config, &save.entries, save.annotations)?;

        let actual = session.state_hash()?;
        if verify && actual != save.checksum {
            tracing::warn!(
                expected = hash::short(&save.checksum),
                actual = hash::short(&actual),
                "replayed state differs from saved checksum"
            );
            return Err(SessionError::ChecksumMismatch {
                expected: save.checksum,
                actual,
            });
        }
        tracing::info!(
            session = %session.config.session_id,
            path = %path.display(),
            steps = session.action_count(),
            "session loaded"
        );
        Ok(session)
    }

    /// Replays this session's applied log into a fresh session.
    pub fn replay(&self) -> Result<Self, SessionError> {
        Self::rebuild(
            self.config.clone(),
            self.game_config.clone(),
            &self.applied,
            self.annotations.clone(),
        )
    }

    fn rebuild(
        config: SessionConfig,
        game_config: G::Config,
        entries: &[LogEntry<G::Action>],
        annotations: Vec<String>,
    ) -> Result<Self, SessionError> {
        let autosave = config.autosave;
        let mut session = Self::new(config.with_autosave(false), game_config)?;

        for entry in entries {
            match entry {
                LogEntry::Action(action) => session.replay_action(action.clone())?,
                LogEntry::Barrier => session.barrier(),
            }
        }
        for note in annotations {
            session.annotate(note);
        }
        session.config.autosave = autosave;
        Ok(session)
    }

    fn replay_action(&mut self, action: G::Action) -> Result<(), SessionError> {
        match self.process(action) {
            Ok(()) => Ok(()),
            Err(SessionError::ActionRejected { step, source, .. }) => {
                let failure = ReplayFailure {
                    step,
                    reason: source.to_string(),
                };
                tracing::warn!(code = "SESSION_REPLAY_FAILURE", "{failure}");
                Err(failure.into())
            }
            Err(err) => {
                tracing::warn!(code = err.error_code(), "replay aborted: {err}");
                Err(err)
            }
        }
    }

    fn autosave(&self) -> Result<(), SessionError> {
        match self.config.save_path() {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }

    /// Human-inspectable JSON summary of the session and its snapshot.
    pub fn to_json(&self) -> Result<String, SessionError> {
        let summary = SessionSummary {
            session_id: &self.config.session_id,
            applied_actions: self.action_count(),
            undoable: self.is_undoable(),
            redoable: self.is_redoable(),
            state_hash: self.state_hash()?,
            annotations: &self.annotations,
            snapshot: self.game.snapshot(),
        };
        Ok(serde_json::to_string_pretty(&summary)?)
    }

    /// Number of applied actions, barriers excluded.
    pub fn action_count(&self) -> usize {
        self.applied
            .iter()
            .filter(|entry| matches!(entry, LogEntry::Action(_)))
            .count()
    }

    /// Applied log, barriers included.
    pub fn entries(&self) -> &[LogEntry<G::Action>] {
        &self.applied
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn game_config(&self) -> &G::Config {
        &self.game_config
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn manager(&self) -> &StateManager {
        &self.manager
    }

    pub fn report(&self) -> &ReportLog {
        &self.report
    }
}

impl<G: Game> std::fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.config.session_id)
            .field("applied", &self.applied.len())
            .field("undone", &self.undone.len())
            .field("stack", self.manager.stack())
            .finish()
    }
}
