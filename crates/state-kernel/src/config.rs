/// Kernel configuration shared by a [`StateManager`](crate::StateManager) and its stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelConfig {
    /// Trip a debug assertion when a change applies outside any open change set.
    ///
    /// Release builds only log and count such mutations.
    pub strict_unattached: bool,
}

impl KernelConfig {
    pub const fn new() -> Self {
        Self {
            strict_unattached: false,
        }
    }

    pub const fn strict() -> Self {
        Self {
            strict_unattached: true,
        }
    }

    #[must_use]
    pub const fn with_strict_unattached(mut self, strict: bool) -> Self {
        self.strict_unattached = strict;
        self
    }
}
