//! Connector lifecycle state model.
//!
//! A [`ConnectorRecord`] owns the mutable facts about one connector and
//! enforces the transition table. Readers never see a record directly; they
//! receive [`ConnectorStatus`] snapshots computed at a given instant.

mod record;
mod status;

pub use record::{ConnectorRecord, Discovery};
pub use status::{ConnectorFault, ConnectorStatus};
