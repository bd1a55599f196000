//! Observed connector phases.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Point-in-time phase of a connector as reported by the daemon.
///
/// The enumeration is closed. No ordering between phases is implied by the
/// protocol; `Ord` exists only so states can key sorted collections.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RunningState {
    /// Known to the daemon but not installed.
    Available,
    /// Installed without an accepted configuration.
    Installed,
    /// Installed with a valid configuration.
    Configured,
    /// Enabled by the user and ready to start.
    Enabled,
    /// Backing process is up and reported ready.
    Running,
    /// An unexpected failure was reported.
    Error,
    /// A stop command is in progress.
    Stopping,
    /// Configuration is being hot-reloaded.
    Updating,
    /// Removal is in progress.
    Uninstalling,
}

impl RunningState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Available,
        Self::Installed,
        Self::Configured,
        Self::Enabled,
        Self::Running,
        Self::Error,
        Self::Stopping,
        Self::Updating,
        Self::Uninstalling,
    ];

    /// Returns `true` for states in which a backing process exists.
    #[must_use]
    pub const fn has_process(self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn serialises_in_snake_case() {
        let json = serde_json::to_string(&RunningState::Uninstalling).expect("serialise");
        assert_eq!(json, r#""uninstalling""#);
    }

    #[test]
    fn parses_case_insensitively() {
        let parsed = RunningState::from_str("Running").expect("parse state");
        assert_eq!(parsed, RunningState::Running);
        assert!(RunningState::from_str("stopped").is_err());
    }
}
