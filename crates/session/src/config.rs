//! Session configuration.
use std::env;
use std::path::PathBuf;

use state_kernel::KernelConfig;

/// Settings of one [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Identifier written into save headers and used as the save file name.
    pub session_id: String,
    /// Directory for autosaves; autosave is inert without one.
    pub save_dir: Option<PathBuf>,
    /// Save after every committed action.
    pub autosave: bool,
    /// Compare the stored checksum with the replayed state on load.
    pub verify_checksum: bool,
    pub kernel: KernelConfig,
}

impl SessionConfig {
    pub const DEFAULT_SESSION_ID: &'static str = "session";
    pub const SAVE_EXTENSION: &'static str = "save";

    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Builds a configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(id) = env::var("STATE_SESSION_ID") {
            if !id.trim().is_empty() {
                config.session_id = id;
            }
        }
        config.save_dir = env::var("STATE_SAVE_DIR").ok().map(PathBuf::from);

        if let Some(autosave) = read_env::<bool>("STATE_AUTOSAVE") {
            config.autosave = autosave;
        }
        if let Some(verify) = read_env::<bool>("STATE_VERIFY_CHECKSUM") {
            config.verify_checksum = verify;
        }
        if let Some(strict) = read_env::<bool>("STATE_STRICT_UNATTACHED") {
            config.kernel = config.kernel.with_strict_unattached(strict);
        }

        config
    }

    #[must_use]
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    #[must_use]
    pub fn with_kernel(mut self, kernel: KernelConfig) -> Self {
        self.kernel = kernel;
        self
    }

    /// `<save_dir>/<session_id>.save`, when a save directory is configured.
    pub fn save_path(&self) -> Option<PathBuf> {
        self.save_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", self.session_id, Self::SAVE_EXTENSION)))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: Self::DEFAULT_SESSION_ID.to_string(),
            save_dir: None,
            autosave: false,
            verify_checksum: true,
            kernel: KernelConfig::default(),
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
