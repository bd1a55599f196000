//! Names of the operations exposed by the façade.

use conductor_protocol::ConnectorAction;
use strum::{Display, EnumString, IntoStaticStr};

/// Operation a failure is attributed to.
///
/// The string form is used as the `operation` half of a UI error's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// List connectors known to the daemon.
    Discover,
    /// Install a connector.
    Install,
    /// Replace a connector's configuration.
    UpdateConfig,
    /// Enable a configured connector.
    Enable,
    /// Start the backing process.
    Start,
    /// Stop the backing process.
    Stop,
    /// Stop then start the backing process.
    Restart,
    /// Remove a connector.
    Uninstall,
    /// Query aggregate health.
    Health,
    /// Query per-state counts.
    States,
}

impl Operation {
    /// Stable name used in error records and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl From<ConnectorAction> for Operation {
    fn from(action: ConnectorAction) -> Self {
        match action {
            ConnectorAction::Start => Self::Start,
            ConnectorAction::Stop => Self::Stop,
            ConnectorAction::Restart => Self::Restart,
            ConnectorAction::Enable => Self::Enable,
            ConnectorAction::Uninstall => Self::Uninstall,
        }
    }
}
