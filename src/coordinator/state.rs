//! Open state of a channel.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// OpenState
// ============================================================================

/// Lifecycle state tracked by a [`CallOnceCoordinator`](super::CallOnceCoordinator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenState {
    /// Nobody has asked for the channel yet.
    #[default]
    Idle,

    /// A physical open is in flight.
    Opening,

    /// The channel is usable.
    Opened,

    /// The open failed or the owner faulted the channel.
    Faulted,

    /// The channel was aborted or closed.
    Closed,
}

impl OpenState {
    /// Returns `true` for `Faulted` and `Closed`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Faulted | Self::Closed)
    }

    /// Returns the lowercase name used in logs.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::Opened => "opened",
            Self::Faulted => "faulted",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for OpenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(OpenState::default(), OpenState::Idle);
    }

    #[test]
    fn test_terminal_states() {
        assert!(OpenState::Faulted.is_terminal());
        assert!(OpenState::Closed.is_terminal());
        assert!(!OpenState::Idle.is_terminal());
        assert!(!OpenState::Opening.is_terminal());
        assert!(!OpenState::Opened.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(OpenState::Opening.to_string(), "opening");
    }
}
