//! Correlation-id keyed matching of responses to pending requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use conductor_protocol::{CorrelationId, Response};
use tokio::sync::oneshot;

use crate::errors::TransportError;
use crate::reporter::LifecycleReporter;
use crate::sync::lock;

const ROUTER_TARGET: &str = "conductor_client::router";

/// Table of requests awaiting a response.
///
/// The transport hands every decoded response to [`ResponseRouter::deliver`];
/// the router forwards it to whichever caller registered the same
/// correlation id. Arrival order across requests does not matter.
pub struct ResponseRouter {
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<Response>>>,
    reporter: Arc<dyn LifecycleReporter>,
}

impl ResponseRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new(reporter: Arc<dyn LifecycleReporter>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            reporter,
        }
    }

    /// Registers interest in the response for `correlation_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::DuplicateCorrelationId`] when a request with
    /// the same id is still outstanding.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
    ) -> Result<oneshot::Receiver<Response>, TransportError> {
        let mut pending = lock(&self.pending);
        if pending
            .get(&correlation_id)
            .is_some_and(|sender| !sender.is_closed())
        {
            return Err(TransportError::DuplicateCorrelationId { correlation_id });
        }
        let (sender, receiver) = oneshot::channel();
        pending.insert(correlation_id, sender);
        Ok(receiver)
    }

    /// Routes a response to its caller.
    ///
    /// Returns `false` when no caller is waiting, in which case the response
    /// is dropped.
    pub fn deliver(&self, response: Response) -> bool {
        let sender = response
            .correlation_id()
            .and_then(|correlation_id| lock(&self.pending).remove(correlation_id));
        let Some(sender) = sender else {
            self.reporter.response_unmatched(response.correlation_id());
            return false;
        };
        match sender.send(response) {
            Ok(()) => true,
            Err(response) => {
                self.reporter.response_unmatched(response.correlation_id());
                false
            }
        }
    }

    /// Stops waiting for `correlation_id`.
    ///
    /// Returns `true` when an entry was pending.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        lock(&self.pending).remove(correlation_id).is_some()
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}

/// Withdraws a pending entry from its router when dropped.
///
/// Held across the wait for a response so that a caller whose future is
/// dropped mid-flight does not leave its entry behind.
pub(crate) struct PendingGuard<'a> {
    router: &'a ResponseRouter,
    correlation_id: CorrelationId,
}

impl<'a> PendingGuard<'a> {
    pub(crate) const fn new(router: &'a ResponseRouter, correlation_id: CorrelationId) -> Self {
        Self {
            router,
            correlation_id,
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.router.cancel(&self.correlation_id) {
            tracing::trace!(
                target: ROUTER_TARGET,
                correlation_id = %self.correlation_id,
                "withdrew pending request"
            );
        }
    }
}
