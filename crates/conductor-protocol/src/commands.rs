//! Request builders for the connector resource paths.
//!
//! Every lifecycle command addresses `/connectors/{id}/...` with the id bound
//! as a path parameter, so the daemon can route on the template alone.

use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::ids::ConnectorId;
use crate::request::{Params, Request};

/// Collection path for discovery.
pub const CONNECTORS_PATH: &str = "/connectors";
/// Aggregate health path.
pub const HEALTH_PATH: &str = "/connectors/health";
/// Per-state counts path.
pub const STATES_PATH: &str = "/connectors/states";
/// Installation path template.
pub const INSTALL_PATH: &str = "/connectors/{id}/install";
/// Configuration path template.
pub const CONFIG_PATH: &str = "/connectors/{id}/config";
/// Action path template.
pub const ACTION_PATH: &str = "/connectors/{id}/{action}";

/// Lifecycle commands addressed through [`ACTION_PATH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectorAction {
    /// Start the backing process.
    Start,
    /// Stop the backing process.
    Stop,
    /// Stop then start the backing process.
    Restart,
    /// Mark the connector as enabled.
    Enable,
    /// Remove the connector.
    Uninstall,
}

impl ConnectorAction {
    /// Path segment and operation name for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Enable => "enable",
            Self::Uninstall => "uninstall",
        }
    }
}

/// `GET /connectors`
#[must_use]
pub fn discover() -> Request {
    Request::get(CONNECTORS_PATH, Params::new())
}

/// `POST /connectors/{id}/install` with `{source, config}`.
#[must_use]
pub fn install(id: &ConnectorId, source: &str, config: Map<String, Value>) -> Request {
    let mut body = Params::new();
    body.insert("source".to_owned(), Value::from(source));
    body.insert("config".to_owned(), Value::Object(config));
    Request::post(INSTALL_PATH, body).with_path_param("id", id.as_str())
}

/// `PUT /connectors/{id}/config` with the new configuration as the body.
#[must_use]
pub fn update_config(id: &ConnectorId, config: Map<String, Value>) -> Request {
    Request::put(CONFIG_PATH, config).with_path_param("id", id.as_str())
}

/// `POST /connectors/{id}/{action}`
#[must_use]
pub fn action(id: &ConnectorId, action: ConnectorAction) -> Request {
    Request::post(ACTION_PATH, Params::new())
        .with_path_param("id", id.as_str())
        .with_path_param("action", action.as_str())
}

/// `GET /connectors/health`
#[must_use]
pub fn health() -> Request {
    Request::get(HEALTH_PATH, Params::new())
}

/// `GET /connectors/states`
#[must_use]
pub fn states() -> Request {
    Request::get(STATES_PATH, Params::new())
}
