// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the call-completion core.
//!
//! [`MockCall`] stands in for the transport's in-flight call record: it
//! captures the single delivered outcome and fails loudly if a second one
//! arrives, the way a real transport rejects double delivery. The fixture
//! messages give tests concrete request/response payload types without any
//! schema tooling.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use quill_rpc::{CallOutcome, InboundCall, Trace, UserCredentials};

/// Fixture request payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EchoRequest {
    #[prost(string, tag = "1")]
    pub body: String,
}

/// Fixture response payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EchoResponse {
    #[prost(string, tag = "1")]
    pub body: String,
}

/// Fixture application-error detail, as a service schema would define it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BadFieldError {
    #[prost(string, tag = "1")]
    pub field: String,
}

/// In-memory call record.
pub struct MockCall {
    credentials: UserCredentials,
    remote_address: SocketAddr,
    trace: Arc<Trace>,
    delivered: Mutex<Option<CallOutcome>>,
}

impl MockCall {
    /// Build a record for `user` calling from `address` (e.g.
    /// `"127.0.0.1:7051"`).
    pub fn new(user: &str, address: &str) -> Arc<Self> {
        Self::with_credentials(UserCredentials::new(user), address)
    }

    pub fn with_credentials(credentials: UserCredentials, address: &str) -> Arc<Self> {
        Arc::new(Self {
            credentials,
            remote_address: address.parse().expect("mock remote address"),
            trace: Arc::new(Trace::new()),
            delivered: Mutex::new(None),
        })
    }

    /// The record as the trait object the context is constructed with.
    pub fn handle(this: &Arc<Self>) -> Arc<dyn InboundCall> {
        Arc::clone(this) as Arc<dyn InboundCall>
    }

    /// The outcome delivered so far, if any.
    pub fn delivered(&self) -> Option<CallOutcome> {
        self.delivered.lock().clone()
    }
}

impl InboundCall for MockCall {
    fn user_credentials(&self) -> &UserCredentials {
        &self.credentials
    }

    fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }

    fn trace(&self) -> &Arc<Trace> {
        &self.trace
    }

    fn complete(&self, outcome: CallOutcome) {
        let mut slot = self.delivered.lock();
        assert!(
            slot.is_none(),
            "outcome delivered twice for the same call: second was {:?}",
            outcome.kind()
        );
        *slot = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_captures_single_outcome() {
        let call = MockCall::new("alice", "127.0.0.1:7051");
        assert!(call.delivered().is_none());

        call.complete(CallOutcome::Success {
            payload: Bytes::from_static(b"ok"),
        });
        assert_eq!(
            call.delivered(),
            Some(CallOutcome::Success {
                payload: Bytes::from_static(b"ok"),
            })
        );
    }

    #[test]
    #[should_panic(expected = "delivered twice")]
    fn test_second_delivery_panics() {
        let call = MockCall::new("alice", "127.0.0.1:7051");
        call.complete(CallOutcome::Success {
            payload: Bytes::new(),
        });
        call.complete(CallOutcome::Success {
            payload: Bytes::new(),
        });
    }
}
