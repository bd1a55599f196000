//! Scripted stand-in for the connector daemon.
//!
//! Replies are queued per resolved path and delivered to the router from
//! inside `dispatch`, echoing the request's correlation id.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use conductor_protocol::{ErrorBody, ErrorCode, Payload, Request, Response};

use crate::errors::TransportError;
use crate::facade::RequestSink;
use crate::router::ResponseRouter;

/// What the daemon does with the next request to a path.
#[derive(Debug, Clone)]
pub enum DaemonReply {
    /// Succeeds with a payload.
    Success(Payload),
    /// Succeeds without data.
    Acknowledge,
    /// Fails with a structured error.
    Failure(ErrorBody),
    /// Never answers.
    Silent,
    /// Refuses the request at the transport.
    Disconnect(String),
}

/// Records requests and replies from a script.
pub struct ScriptedDaemon {
    router: Arc<ResponseRouter>,
    script: Mutex<HashMap<String, VecDeque<DaemonReply>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedDaemon {
    #[must_use]
    pub fn new(router: Arc<ResponseRouter>) -> Self {
        Self {
            router,
            script: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues `reply` for the next request to `path`.
    pub fn reply(&self, path: &str, reply: DaemonReply) {
        self.script
            .lock()
            .expect("daemon script mutex poisoned")
            .entry(path.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .expect("daemon request log mutex poisoned")
            .clone()
    }

    /// Resolved paths of the requests received so far.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.resolved_path().expect("resolved path"))
            .collect()
    }

    fn next_reply(&self, path: &str) -> DaemonReply {
        self.script
            .lock()
            .expect("daemon script mutex poisoned")
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                DaemonReply::Failure(ErrorBody::new(
                    ErrorCode::ResourceNotFound,
                    format!("no scripted reply for {path}"),
                ))
            })
    }
}

impl RequestSink for ScriptedDaemon {
    fn dispatch(&self, request: &Request) -> Result<(), TransportError> {
        self.requests
            .lock()
            .expect("daemon request log mutex poisoned")
            .push(request.clone());
        let path = request.resolved_path().expect("façade sends resolvable paths");
        let correlation_id = request.correlation_id().cloned();
        let response = match self.next_reply(&path) {
            DaemonReply::Success(payload) => Response::success(payload, correlation_id),
            DaemonReply::Acknowledge => Response::acknowledged(correlation_id),
            DaemonReply::Failure(body) => Response::from_error(body, correlation_id),
            DaemonReply::Silent => return Ok(()),
            DaemonReply::Disconnect(reason) => return Err(TransportError::disconnected(reason)),
        };
        self.router.deliver(response);
        Ok(())
    }
}
