//! Envelope protocol shared by the conductor client and the connector daemon.
//!
//! Calls travel as [`Request`] envelopes carrying a method, a logical resource
//! path, and either a body or query parameters. The daemon answers with a
//! [`Response`] whose `success` flag is authoritative: a successful response
//! may carry a [`Payload`] and never an error, while a failed response always
//! carries a structured [`ErrorBody`] and never a payload. Both shapes are
//! enforced at construction and again when decoding from the wire.
//!
//! Error codes form a closed but forward-compatible vocabulary
//! ([`ErrorCode`]). The [`classify`] function maps any error to exactly one
//! [`ErrorCategory`] with a fixed suggested action, and [`UiError`] records
//! carry that classification to the presentation layer, deduplicated per
//! display session by [`ErrorSession`].
//!
//! This crate performs no I/O. Framing and byte encoding belong to the
//! transport.

mod classify;
mod codes;
pub mod commands;
mod errors;
mod fault;
mod ids;
mod payload;
mod request;
mod response;
mod state;
mod ui_error;

pub use classify::{Classification, ErrorCategory, categorize, classify};
pub use codes::ErrorCode;
pub use commands::ConnectorAction;
pub use errors::EnvelopeError;
pub use fault::{ErrorBody, ErrorDetails};
pub use ids::{ConnectorId, CorrelationId};
pub use payload::{
    ConnectorDefinition, ConnectorInfo, HealthReport, OperationResult, Payload, PayloadShape,
    Scalar, StateOverview, SubsystemHealth,
};
pub use request::{Method, Params, Request};
pub use response::{Outcome, Response, ResponseMetadata};
pub use state::RunningState;
pub use ui_error::{ErrorSession, UiError};
