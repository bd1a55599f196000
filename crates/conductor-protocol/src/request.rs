//! Request envelopes.
//!
//! A request names a logical resource (`/connectors/{id}/start`), not a
//! network URL. Convenience constructors fix the method and route parameters
//! to the body or the query string so a GET never carries a body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::errors::EnvelopeError;
use crate::ids::CorrelationId;

/// Structured key-value parameters.
pub type Params = Map<String, Value>;

/// Request verbs understood by the daemon.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    /// Read a resource.
    Get,
    /// Invoke an action or create a resource.
    Post,
    /// Replace a resource.
    Put,
    /// Partially update a resource.
    Patch,
    /// Remove a resource.
    Delete,
}

/// Call envelope sent to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireRequest")]
pub struct Request {
    method: Method,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Params>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_params: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<CorrelationId>,
}

impl Request {
    fn bare(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: None,
            path_params: None,
            correlation_id: None,
        }
    }

    /// Builds a GET request; `params` become query parameters.
    ///
    /// String values are used verbatim and every other value is rendered as
    /// compact JSON.
    #[must_use]
    pub fn get(path: impl Into<String>, params: Params) -> Self {
        let mut request = Self::bare(Method::Get, path);
        if !params.is_empty() {
            let query = params
                .into_iter()
                .map(|(key, value)| (key, query_value(value)))
                .collect();
            request.query = Some(query);
        }
        request
    }

    /// Builds a POST request; `params` become the body.
    #[must_use]
    pub fn post(path: impl Into<String>, params: Params) -> Self {
        Self::with_body(Method::Post, path, params)
    }

    /// Builds a PUT request; `params` become the body.
    #[must_use]
    pub fn put(path: impl Into<String>, params: Params) -> Self {
        Self::with_body(Method::Put, path, params)
    }

    /// Builds a DELETE request without a body.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::bare(Method::Delete, path)
    }

    fn with_body(method: Method, path: impl Into<String>, params: Params) -> Self {
        let mut request = Self::bare(method, path);
        if !params.is_empty() {
            request.body = Some(params);
        }
        request
    }

    /// Attaches a correlation id, replacing any existing one.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Binds a `{name}` segment of the path template.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Returns the correlation id, generating one first when absent.
    pub fn ensure_correlation_id(&mut self) -> CorrelationId {
        self.correlation_id
            .get_or_insert_with(CorrelationId::generate)
            .clone()
    }

    /// Request verb.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path template as supplied.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Body parameters, never present on GET.
    #[must_use]
    pub const fn body(&self) -> Option<&Params> {
        self.body.as_ref()
    }

    /// Query parameters.
    #[must_use]
    pub const fn query(&self) -> Option<&BTreeMap<String, String>> {
        self.query.as_ref()
    }

    /// Values bound to `{name}` path segments.
    #[must_use]
    pub const fn path_params(&self) -> Option<&BTreeMap<String, String>> {
        self.path_params.as_ref()
    }

    /// Correlation id, when one has been assigned.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Substitutes path parameters into the path template.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingPathParameter`] when a `{name}` segment
    /// has no bound value.
    pub fn resolved_path(&self) -> Result<String, EnvelopeError> {
        let segments = self
            .path
            .split('/')
            .map(|segment| self.resolve_segment(segment))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(segments.join("/"))
    }

    fn resolve_segment<'a>(&'a self, segment: &'a str) -> Result<&'a str, EnvelopeError> {
        let Some(name) = segment
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        else {
            return Ok(segment);
        };
        self.path_params
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
            .ok_or_else(|| EnvelopeError::missing_path_parameter(&self.path, name))
    }

    /// Re-checks envelope invariants, typically after decoding.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EmptyPath`] for a blank path and
    /// [`EnvelopeError::BodyOnGet`] when a GET carries a body.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.path.trim().is_empty() {
            return Err(EnvelopeError::EmptyPath);
        }
        if self.method == Method::Get && self.body.is_some() {
            return Err(EnvelopeError::BodyOnGet {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

fn query_value(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    method: Method,
    path: String,
    #[serde(default)]
    body: Option<Params>,
    #[serde(default)]
    query: Option<BTreeMap<String, String>>,
    #[serde(default)]
    path_params: Option<BTreeMap<String, String>>,
    #[serde(default)]
    correlation_id: Option<CorrelationId>,
}

impl TryFrom<WireRequest> for Request {
    type Error = EnvelopeError;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        let request = Self {
            method: wire.method,
            path: wire.path,
            body: wire.body,
            query: wire.query,
            path_params: wire.path_params,
            correlation_id: wire.correlation_id,
        };
        request.validate()?;
        Ok(request)
    }
}
