// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! The seam between the completion core and the transport.
//!
//! [`InboundCall`] is the transport-owned bookkeeping entry for one in-flight
//! request. The context borrows it (weakly) and calls back into it for
//! exactly two things: caller identity/trace lookup at construction, and the
//! single outcome delivery at completion. Framing, encryption and socket I/O
//! all live behind [`InboundCall::complete`].

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;

use crate::envelope::ErrorEnvelope;
use crate::trace::Trace;

/// Identity of the remote user who made the call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserCredentials {
    real_user: String,
    effective_user: Option<String>,
}

impl UserCredentials {
    pub fn new(real_user: impl Into<String>) -> Self {
        Self {
            real_user: real_user.into(),
            effective_user: None,
        }
    }

    /// Set the user the caller is acting on behalf of.
    pub fn with_effective_user(mut self, user: impl Into<String>) -> Self {
        self.effective_user = Some(user.into());
        self
    }

    pub fn real_user(&self) -> &str {
        &self.real_user
    }

    pub fn effective_user(&self) -> Option<&str> {
        self.effective_user.as_deref()
    }
}

impl fmt::Display for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.effective_user {
            Some(effective) => write!(f, "{} (effective {})", self.real_user, effective),
            None => write!(f, "{}", self.real_user),
        }
    }
}

/// Which of the three terminal paths completed a call. Used as the outcome
/// label in metrics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Success,
    Failure,
    ApplicationError,
}

impl CompletionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionKind::Success => "success",
            CompletionKind::Failure => "failure",
            CompletionKind::ApplicationError => "application_error",
        }
    }
}

impl fmt::Display for CompletionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed call, ready for the transport to frame and send.
///
/// On success the context has already serialized the response payload; on
/// either error path it has built the [`ErrorEnvelope`]. The kind
/// distinguishes the two error paths even though both carry an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success {
        payload: Bytes,
    },
    Error {
        kind: CompletionKind,
        envelope: ErrorEnvelope,
    },
}

impl CallOutcome {
    pub fn kind(&self) -> CompletionKind {
        match self {
            CallOutcome::Success { .. } => CompletionKind::Success,
            CallOutcome::Error { kind, .. } => *kind,
        }
    }
}

/// Transport-owned record of one in-flight request.
///
/// The identity accessors must return stable values for the lifetime of the
/// record. `complete` must be safe to reach from any thread; it is the
/// transport's job, not this core's, to reject a second delivery for the
/// same call should a defective handler stack produce one.
pub trait InboundCall: Send + Sync {
    /// Credentials of the remote user who made the call.
    fn user_credentials(&self) -> &UserCredentials;

    /// Remote address the call arrived from.
    fn remote_address(&self) -> SocketAddr;

    /// The per-call diagnostics trace.
    fn trace(&self) -> &Arc<Trace>;

    /// Deliver the completed outcome for transmission. Never blocks the
    /// caller; actual network transmission happens asynchronously inside the
    /// transport, and transmit failures are handled (logged, counted) there.
    fn complete(&self, outcome: CallOutcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_display() {
        let creds = UserCredentials::new("alice");
        assert_eq!(creds.to_string(), "alice");

        let creds = UserCredentials::new("alice").with_effective_user("bob");
        assert_eq!(creds.to_string(), "alice (effective bob)");
        assert_eq!(creds.real_user(), "alice");
        assert_eq!(creds.effective_user(), Some("bob"));
    }

    #[test]
    fn test_outcome_kind() {
        let outcome = CallOutcome::Success {
            payload: Bytes::new(),
        };
        assert_eq!(outcome.kind(), CompletionKind::Success);

        let outcome = CallOutcome::Error {
            kind: CompletionKind::ApplicationError,
            envelope: ErrorEnvelope::application("e"),
        };
        assert_eq!(outcome.kind(), CompletionKind::ApplicationError);
        assert_eq!(outcome.kind().as_str(), "application_error");
    }
}
