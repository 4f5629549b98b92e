// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! The per-request context handed to service handlers.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Instant;

use prost::Message;

use crate::call::{CallOutcome, CompletionKind, InboundCall, UserCredentials};
use crate::envelope::ErrorEnvelope;
use crate::metrics::MethodMetrics;
use crate::status::Status;
use crate::trace::Trace;

/// The context for one inbound call.
///
/// Owns the decoded request and the response payload the handler fills in,
/// and exposes exactly one of three completion operations. Each completion
/// method takes `self`, so a call is completed exactly once and neither the
/// context nor its payloads can be touched afterwards; a second completion
/// is a compile error, not a runtime check:
///
/// ```compile_fail
/// use std::sync::Arc;
/// use quill_rpc::{InboundCall, MethodMetrics, RpcContext};
/// use quill_testing::{EchoRequest, EchoResponse, MockCall};
///
/// let call: Arc<dyn InboundCall> = MockCall::new("alice", "127.0.0.1:7051");
/// let ctx = RpcContext::new(
///     &call,
///     EchoRequest::default(),
///     EchoResponse::default(),
///     MethodMetrics::new("EchoService", "Echo"),
/// );
/// ctx.respond_success();
/// ctx.respond_success(); // error[E0382]: use of moved value: `ctx`
/// ```
///
/// The context is `Send`: a handler may return without completing, hand the
/// context to another thread and complete it there once asynchronous work
/// finishes.
///
/// ```
/// use std::sync::Arc;
/// use quill_rpc::{InboundCall, MethodMetrics, RpcContext};
/// use quill_testing::{EchoRequest, EchoResponse, MockCall};
///
/// let mock = MockCall::new("alice", "127.0.0.1:7051");
/// let call: Arc<dyn InboundCall> = mock.clone();
/// let mut ctx = RpcContext::new(
///     &call,
///     EchoRequest { body: "ping".into() },
///     EchoResponse::default(),
///     MethodMetrics::new("EchoService", "Echo"),
/// );
///
/// let echo = ctx.request().body.clone();
/// ctx.response_mut().body = echo;
/// std::thread::spawn(move || ctx.respond_success()).join().unwrap();
/// assert!(mock.delivered().is_some());
/// ```
pub struct RpcContext<Req, Res>
where
    Req: Message,
    Res: Message,
{
    call: Weak<dyn InboundCall>,
    request: Req,
    response: Res,
    // Caller identity is snapshotted at construction so the accessors stay
    // valid for the whole context lifetime, even across connection teardown.
    credentials: UserCredentials,
    remote_address: SocketAddr,
    trace: Arc<Trace>,
    metrics: MethodMetrics,
    received_at: Instant,
}

impl<Req, Res> RpcContext<Req, Res>
where
    Req: Message,
    Res: Message,
{
    /// Build the context for a decoded call. Called by the dispatch layer
    /// immediately before invoking the handler; dispatch guarantees that
    /// `response` is a default instance of the invoked method's reply type.
    pub fn new(
        call: &Arc<dyn InboundCall>,
        request: Req,
        response: Res,
        metrics: MethodMetrics,
    ) -> Self {
        Self {
            credentials: call.user_credentials().clone(),
            remote_address: call.remote_address(),
            trace: Arc::clone(call.trace()),
            call: Arc::downgrade(call),
            request,
            response,
            metrics,
            received_at: Instant::now(),
        }
    }

    /// The decoded request payload. Immutable for the call's lifetime.
    pub fn request(&self) -> &Req {
        &self.request
    }

    pub fn response(&self) -> &Res {
        &self.response
    }

    /// The response payload, for the handler to fill in before completing.
    pub fn response_mut(&mut self) -> &mut Res {
        &mut self.response
    }

    /// The trace buffer for this call, for attaching diagnostic events.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Credentials of the remote user who made the call.
    pub fn user_credentials(&self) -> &UserCredentials {
        &self.credentials
    }

    /// Remote address the call was sent from.
    pub fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }

    /// A string identifying the requestor, user and address both. Suitable
    /// for log messages.
    pub fn requestor_string(&self) -> String {
        format!("{}@{}", self.credentials, self.remote_address)
    }

    /// Complete the call successfully, sending the response payload as
    /// prepared through [`response_mut`](Self::response_mut).
    ///
    /// May be called before or after the handler method returns, and from
    /// any thread. The context and both payloads are destroyed when this
    /// returns; transmit failures never surface back to the handler.
    pub fn respond_success(self) {
        let payload = self.response.encode_to_vec().into();
        self.finish(CallOutcome::Success { payload });
    }

    /// Complete the call with a generic error: code `ERROR_APPLICATION` and
    /// the status's message as the envelope text.
    ///
    /// There is no more specific code for the client to act on, so this path
    /// is for unexpected errors only; services that want the client to do
    /// richer handling define an error extension and use
    /// [`respond_application_error`](Self::respond_application_error).
    pub fn respond_failure(self, status: &Status) {
        let envelope = ErrorEnvelope::application(status.message());
        self.finish(CallOutcome::Error {
            kind: CompletionKind::Failure,
            envelope,
        });
    }

    /// Complete the call with an application-level error: the caller gets a
    /// remote error with `message`, plus `detail` serialized under the
    /// service-specific extension id. Callers that recognize the id decode
    /// the detail; everyone else still reads the message.
    ///
    /// `ext_id` must be a value the service's schema reserves at or above
    /// [`MIN_APPLICATION_EXTENSION_ID`] and keeps unique across the code
    /// base. A reserved id is a defect in the service, not a runtime
    /// condition, and fails fast.
    pub fn respond_application_error(
        self,
        ext_id: u32,
        message: impl Into<String>,
        detail: &impl Message,
    ) {
        let envelope = ErrorEnvelope::application(message)
            .with_extension(ext_id, detail.encode_to_vec().into())
            .unwrap_or_else(|err| panic!("respond_application_error: {}", err));
        self.finish(CallOutcome::Error {
            kind: CompletionKind::ApplicationError,
            envelope,
        });
    }

    fn finish(self, outcome: CallOutcome) {
        let kind = outcome.kind();
        self.metrics.record(kind, self.received_at.elapsed());
        match self.call.upgrade() {
            Some(call) => {
                tracing::debug!(
                    requestor = %self.requestor_string(),
                    service = self.metrics.service(),
                    method = self.metrics.method(),
                    outcome = kind.as_str(),
                    "call completed"
                );
                call.complete(outcome);
            }
            None => {
                // Connection torn down before the handler completed; the
                // client is gone, so the outcome has nowhere to go.
                tracing::warn!(
                    requestor = %self.requestor_string(),
                    method = self.metrics.method(),
                    outcome = kind.as_str(),
                    "call record dropped before completion, discarding outcome"
                );
            }
        }
        // Request and response payloads are dropped here, exactly once.
    }
}
