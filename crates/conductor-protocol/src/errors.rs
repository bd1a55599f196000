//! Errors raised while building or decoding envelopes.

use thiserror::Error;

/// Envelope shape violations.
///
/// These signal programming errors on one side of the channel rather than
/// runtime conditions, so callers are expected to surface them rather than
/// retry.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Response fields disagree with its `success` flag.
    #[error("inconsistent response: {reason}")]
    InconsistentResponse {
        /// Which combination of fields was rejected.
        reason: &'static str,
    },

    /// A GET request carried a body.
    #[error("GET request to {path} must not carry a body")]
    BodyOnGet {
        /// Path of the offending request.
        path: String,
    },

    /// The request path was empty.
    #[error("request path is empty")]
    EmptyPath,

    /// A `{name}` segment in the path had no matching path parameter.
    #[error("path {path} is missing a value for parameter '{name}'")]
    MissingPathParameter {
        /// Template being resolved.
        path: String,
        /// Name of the unresolved segment.
        name: String,
    },

    /// The payload did not have the shape the caller expected.
    #[error("expected a {expected} payload but received {found}")]
    UnexpectedPayload {
        /// Shape the caller asked for.
        expected: &'static str,
        /// Shape that was present.
        found: &'static str,
    },

    /// A loosely-typed payload could not be decoded into the expected shape.
    #[error("failed to decode {expected} payload: {source}")]
    DecodePayload {
        /// Shape the caller asked for.
        expected: &'static str,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },
}

impl EnvelopeError {
    /// Creates an inconsistent-response error.
    #[must_use]
    pub const fn inconsistent(reason: &'static str) -> Self {
        Self::InconsistentResponse { reason }
    }

    /// Creates a missing path parameter error.
    #[must_use]
    pub fn missing_path_parameter(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingPathParameter {
            path: path.into(),
            name: name.into(),
        }
    }
}
