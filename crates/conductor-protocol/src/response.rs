//! Response envelopes.
//!
//! On the wire a response is a flat object with a `success` flag, an optional
//! `payload`, an optional `error`, and mandatory `metadata`. In memory the
//! payload/error pair is an [`Outcome`], so a response that is both
//! successful and failed cannot be represented. Decoding goes through
//! [`Response::from_parts`], which rejects inconsistent combinations.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::codes::ErrorCode;
use crate::errors::EnvelopeError;
use crate::fault::{ErrorBody, ErrorDetails};
use crate::ids::CorrelationId;
use crate::payload::Payload;

/// Envelope metadata present on every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// When the response was generated.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Correlation id echoed from the request, when it supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl ResponseMetadata {
    /// Metadata stamped with the current time.
    #[must_use]
    pub fn now(correlation_id: Option<CorrelationId>) -> Self {
        Self::at(OffsetDateTime::now_utc(), correlation_id)
    }

    /// Metadata stamped with an explicit time.
    #[must_use]
    pub const fn at(timestamp: OffsetDateTime, correlation_id: Option<CorrelationId>) -> Self {
        Self {
            timestamp,
            correlation_id,
        }
    }
}

/// Result carried by a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The call succeeded, optionally returning data.
    Success(Option<Payload>),
    /// The call failed with a structured error.
    Failure(ErrorBody),
}

/// Reply envelope produced by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub struct Response {
    outcome: Outcome,
    metadata: ResponseMetadata,
}

impl Response {
    /// Successful response carrying `payload`.
    #[must_use]
    pub fn success(payload: impl Into<Payload>, correlation_id: Option<CorrelationId>) -> Self {
        Self {
            outcome: Outcome::Success(Some(payload.into())),
            metadata: ResponseMetadata::now(correlation_id),
        }
    }

    /// Successful response without data.
    #[must_use]
    pub fn acknowledged(correlation_id: Option<CorrelationId>) -> Self {
        Self {
            outcome: Outcome::Success(None),
            metadata: ResponseMetadata::now(correlation_id),
        }
    }

    /// Failed response carrying a structured error.
    #[must_use]
    pub fn failure(
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<ErrorDetails>,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        let error = ErrorBody {
            code,
            message: message.into(),
            details,
        };
        Self::from_error(error, correlation_id)
    }

    /// Failed response wrapping an existing error body.
    #[must_use]
    pub fn from_error(error: ErrorBody, correlation_id: Option<CorrelationId>) -> Self {
        Self {
            outcome: Outcome::Failure(error),
            metadata: ResponseMetadata::now(correlation_id),
        }
    }

    /// Assembles a response from its wire fields.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InconsistentResponse`] when a successful
    /// response carries an error, or a failed response carries a payload or
    /// lacks an error.
    pub fn from_parts(
        success: bool,
        payload: Option<Payload>,
        error: Option<ErrorBody>,
        metadata: ResponseMetadata,
    ) -> Result<Self, EnvelopeError> {
        let outcome = match (success, payload, error) {
            (true, _, Some(_)) => {
                return Err(EnvelopeError::inconsistent(
                    "successful response carries an error",
                ));
            }
            (true, payload, None) => Outcome::Success(payload),
            (false, Some(_), _) => {
                return Err(EnvelopeError::inconsistent(
                    "failed response carries a payload",
                ));
            }
            (false, None, None) => {
                return Err(EnvelopeError::inconsistent(
                    "failed response is missing its error",
                ));
            }
            (false, None, Some(error)) => Outcome::Failure(error),
        };
        Ok(Self { outcome, metadata })
    }

    /// Authoritative success flag.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Payload of a successful response.
    #[must_use]
    pub const fn payload(&self) -> Option<&Payload> {
        match &self.outcome {
            Outcome::Success(payload) => payload.as_ref(),
            Outcome::Failure(_) => None,
        }
    }

    /// Error of a failed response.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorBody> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    /// Envelope metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ResponseMetadata {
        &self.metadata
    }

    /// Correlation id echoed from the request.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.metadata.correlation_id.as_ref()
    }

    /// Consumes the response, yielding its outcome.
    #[must_use]
    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }

    /// Converts the outcome into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the error body of a failed response.
    pub fn into_result(self) -> Result<Option<Payload>, ErrorBody> {
        match self.outcome {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Failure(error) => Err(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    metadata: ResponseMetadata,
}

impl From<Response> for WireResponse {
    fn from(response: Response) -> Self {
        let (success, payload, error) = match response.outcome {
            Outcome::Success(payload) => (true, payload, None),
            Outcome::Failure(error) => (false, None, Some(error)),
        };
        Self {
            success,
            payload,
            error,
            metadata: response.metadata,
        }
    }
}

impl TryFrom<WireResponse> for Response {
    type Error = EnvelopeError;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        Self::from_parts(wire.success, wire.payload, wire.error, wire.metadata)
    }
}
