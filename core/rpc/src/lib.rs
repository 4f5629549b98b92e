// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! Server-side call-completion core.
//!
//! When the surrounding RPC engine decodes an inbound request it builds an
//! [`RpcContext`] around the request/response payloads and hands it to the
//! resolved service handler. The handler reads the request, fills in the
//! response in place and then completes the call exactly once, through one of
//! three terminal paths: success, generic failure, or an application-specific
//! error carried as an extension of the generic [`ErrorEnvelope`].
//!
//! Completion consumes the context, so the one-shot contract is enforced by
//! the type system rather than by a responded flag. The context may be moved
//! to another thread and completed there, before or after the handler itself
//! returns.
//!
//! Everything transport-shaped (framing, sockets, dispatch, auth negotiation)
//! stays behind the [`InboundCall`] seam.

pub mod call;
pub mod context;
pub mod envelope;
pub mod metrics;
pub mod status;
pub mod trace;

pub use call::{CallOutcome, CompletionKind, InboundCall, UserCredentials};
pub use context::RpcContext;
pub use envelope::{
    EnvelopeError, ErrorCode, ErrorEnvelope, ErrorExtension, MIN_APPLICATION_EXTENSION_ID,
};
pub use metrics::MethodMetrics;
pub use status::{Status, StatusKind};
pub use trace::{Trace, TraceEvent};
