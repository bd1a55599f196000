//! Test harness utilities for the client behavioural suites.

mod config_loader;
mod connector_world;
mod daemon;
mod reporter;
mod world;

pub use connector_world::{ConnectorWorld, REQUEST_TIMEOUT, connector_world};
pub use daemon::{DaemonReply, ScriptedDaemon};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use world::{TestWorld, world};
