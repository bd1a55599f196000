//! Success payloads.
//!
//! The payload is a sum type over the shapes the daemon actually returns.
//! Callers decode it lazily with [`Payload::decode`] because only the caller
//! knows which shape a given path should produce. On the wire a payload is
//! either tagged (`{"shape": ..., "value": ...}`) or a bare JSON value; bare
//! values land in the untyped [`Payload::Scalar`], [`Payload::List`] and
//! [`Payload::Map`] variants and are decoded through `serde` on demand.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::EnvelopeError;
use crate::ids::ConnectorId;
use crate::state::RunningState;

/// Data carried by a successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// A single scalar value.
    Scalar(Scalar),
    /// An untyped list.
    List(Vec<Value>),
    /// An untyped map.
    Map(Map<String, Value>),
    /// Connector definitions returned by discovery.
    Connectors(Vec<ConnectorDefinition>),
    /// Information about one connector.
    ConnectorInfo(ConnectorInfo),
    /// Outcome of a lifecycle command.
    OperationResult(OperationResult),
    /// Aggregate health of the connector subsystem.
    Health(HealthReport),
    /// Connector counts per state.
    StateOverview(StateOverview),
}

impl Payload {
    /// Name of the variant, used in diagnostics.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Connectors(_) => "connectors",
            Self::ConnectorInfo(_) => "connector_info",
            Self::OperationResult(_) => "operation_result",
            Self::Health(_) => "health",
            Self::StateOverview(_) => "state_overview",
        }
    }

    /// Decodes the payload into the shape the caller expects.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::UnexpectedPayload`] for a mismatched typed
    /// variant and [`EnvelopeError::DecodePayload`] when an untyped map or list
    /// does not deserialize into `T`.
    pub fn decode<T: PayloadShape>(self) -> Result<T, EnvelopeError> {
        match T::extract(self) {
            Ok(value) => Ok(value),
            Err(Self::Map(map)) => decode_value(Value::Object(map)),
            Err(Self::List(items)) => decode_value(Value::Array(items)),
            Err(other) => Err(EnvelopeError::UnexpectedPayload {
                expected: T::SHAPE,
                found: other.shape(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WirePayload::deserialize(deserializer)? {
            WirePayload::Tagged(tagged) => tagged.into(),
            WirePayload::Scalar(value) => Self::Scalar(value),
            WirePayload::List(items) => Self::List(items),
            WirePayload::Map(map) => Self::Map(map),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WirePayload {
    Tagged(TaggedPayload),
    Scalar(Scalar),
    List(Vec<Value>),
    Map(Map<String, Value>),
}

#[derive(Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
enum TaggedPayload {
    Scalar(Scalar),
    List(Vec<Value>),
    Map(Map<String, Value>),
    Connectors(Vec<ConnectorDefinition>),
    ConnectorInfo(ConnectorInfo),
    OperationResult(OperationResult),
    Health(HealthReport),
    StateOverview(StateOverview),
}

impl From<TaggedPayload> for Payload {
    fn from(tagged: TaggedPayload) -> Self {
        match tagged {
            TaggedPayload::Scalar(value) => Self::Scalar(value),
            TaggedPayload::List(items) => Self::List(items),
            TaggedPayload::Map(map) => Self::Map(map),
            TaggedPayload::Connectors(definitions) => Self::Connectors(definitions),
            TaggedPayload::ConnectorInfo(info) => Self::ConnectorInfo(info),
            TaggedPayload::OperationResult(result) => Self::OperationResult(result),
            TaggedPayload::Health(report) => Self::Health(report),
            TaggedPayload::StateOverview(overview) => Self::StateOverview(overview),
        }
    }
}

fn decode_value<T: PayloadShape>(value: Value) -> Result<T, EnvelopeError> {
    serde_json::from_value(value).map_err(|source| EnvelopeError::DecodePayload {
        expected: T::SHAPE,
        source,
    })
}

/// Types that can be pulled out of a [`Payload`].
pub trait PayloadShape: DeserializeOwned + Sized {
    /// Shape name reported in decode errors.
    const SHAPE: &'static str;

    /// Extracts the typed variant, handing the payload back on mismatch.
    ///
    /// # Errors
    ///
    /// Returns the original payload when it is not this shape.
    fn extract(payload: Payload) -> Result<Self, Payload>;
}

macro_rules! payload_shape {
    ($type:ty, $variant:ident, $shape:literal) => {
        impl PayloadShape for $type {
            const SHAPE: &'static str = $shape;

            fn extract(payload: Payload) -> Result<Self, Payload> {
                match payload {
                    Payload::$variant(value) => Ok(value),
                    other => Err(other),
                }
            }
        }

        impl From<$type> for Payload {
            fn from(value: $type) -> Self {
                Self::$variant(value)
            }
        }
    };
}

payload_shape!(Vec<ConnectorDefinition>, Connectors, "connectors");
payload_shape!(ConnectorInfo, ConnectorInfo, "connector_info");
payload_shape!(OperationResult, OperationResult, "operation_result");
payload_shape!(HealthReport, Health, "health");
payload_shape!(StateOverview, StateOverview, "state_overview");
payload_shape!(Scalar, Scalar, "scalar");

/// Scalar payload values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// Integral value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
}

/// Connector advertised by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorDefinition {
    /// Stable identifier.
    pub id: ConnectorId,
    /// Display name.
    pub name: String,
    /// Published version, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Short description, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether configuration can be reloaded without a restart.
    #[serde(default)]
    pub supports_hot_reload: bool,
    /// Installation status; `None` means the daemon did not say.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<bool>,
}

/// Connector details returned after installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInfo {
    /// Stable identifier.
    pub id: ConnectorId,
    /// Display name.
    pub name: String,
    /// Installed version, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Observed phase after the command.
    pub state: RunningState,
    /// Declared-enabled flag.
    #[serde(default)]
    pub enabled: bool,
    /// Whether configuration can be reloaded without a restart.
    #[serde(default)]
    pub supports_hot_reload: bool,
}

/// Outcome of a lifecycle command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Connector the command addressed.
    pub connector_id: ConnectorId,
    /// Observed phase once the command completed.
    pub state: RunningState,
    /// Whether the connector was running before the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_running: Option<bool>,
    /// Backing process id, present while a process exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Whether a configuration change only takes effect after a restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_restart: Option<bool>,
    /// Whether a configuration change was applied in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_reload_applied: Option<bool>,
    /// Free-form note from the daemon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationResult {
    /// Builds a result with only the mandatory fields set.
    #[must_use]
    pub const fn new(connector_id: ConnectorId, state: RunningState) -> Self {
        Self {
            connector_id,
            state,
            was_running: None,
            process_id: None,
            requires_restart: None,
            hot_reload_applied: None,
            message: None,
        }
    }
}

/// Aggregate health of the connector subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Overall score from 0 (down) to 100 (fully healthy).
    pub score: u8,
    /// Status of each subsystem, keyed by name.
    #[serde(default)]
    pub subsystems: BTreeMap<String, SubsystemHealth>,
}

/// Status of one subsystem inside a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemHealth {
    /// Whether the subsystem is operating normally.
    pub healthy: bool,
    /// Optional explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Connector counts per state plus the ids currently running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateOverview {
    /// Number of connectors in each state; absent states count zero.
    pub counts: BTreeMap<RunningState, usize>,
    /// Connectors currently in the `running` state.
    pub running: Vec<ConnectorId>,
}

impl StateOverview {
    /// Count for a single state.
    #[must_use]
    pub fn count(&self, state: RunningState) -> usize {
        self.counts.get(&state).copied().unwrap_or_default()
    }

    /// Total number of connectors counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
