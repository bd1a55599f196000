//! Control and observation layer for connectors managed by a background
//! daemon.
//!
//! Commands flow out through the [`ConnectorClient`] façade: each one is
//! validated against the local lifecycle model, wrapped in a request envelope
//! from [`conductor_protocol`], and handed to a [`RequestSink`]. Responses
//! come back through the [`ResponseRouter`], which matches them to callers by
//! correlation id. State flows the other way: the transport decodes status,
//! heartbeat and state-change events and feeds them to the
//! [`StatusSynchronizer`], which owns one [`lifecycle::ConnectorRecord`] per
//! connector and publishes a [`StatusChange`] whenever a connector's
//! observable status actually changes.
//!
//! The layer performs no I/O of its own. Socket framing, process supervision
//! and rendering belong to the embedding application.
//!
//! Every failure reaching a caller is an [`OperationFailure`] carrying a
//! classified [`conductor_protocol::UiError`], so presentation code never has
//! to inspect raw codes. Structured telemetry is emitted through a
//! [`LifecycleReporter`]; [`bootstrap_with`] wires all of it from layered
//! configuration.

mod bootstrap;
mod clock;
mod errors;
mod facade;
pub mod lifecycle;
mod operation;
mod reporter;
mod router;
mod sync;
pub mod telemetry;

pub use bootstrap::{BootstrapError, ConfigLoader, Conductor, SystemConfigLoader, bootstrap_with};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{OperationFailure, TransitionError, TransportError};
pub use facade::{ConnectorClient, RequestSink};
pub use operation::Operation;
pub use reporter::{LifecycleReporter, StructuredLifecycleReporter};
pub use router::ResponseRouter;
pub use sync::{
    ReconciliationFailure, StatusChange, StatusEvent, StatusEventKind, StatusSynchronizer,
    SyncTiming,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
