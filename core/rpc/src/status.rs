// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! General-purpose status value reported by handlers.
//!
//! `Status` is the input to the generic failure path: an error kind plus a
//! human-readable message. On the wire only the message survives (the
//! envelope code is always `ERROR_APPLICATION`); the kind exists for
//! server-side logging and for handler code that inspects its own errors.

use std::fmt;

/// Classification of a handler-reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    NotFound,
    Corruption,
    NotSupported,
    InvalidArgument,
    IoError,
    AlreadyPresent,
    RuntimeError,
    NetworkError,
    IllegalState,
    Aborted,
    ServiceUnavailable,
    TimedOut,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::NotFound => "Not found",
            StatusKind::Corruption => "Corruption",
            StatusKind::NotSupported => "Not implemented",
            StatusKind::InvalidArgument => "Invalid argument",
            StatusKind::IoError => "IO error",
            StatusKind::AlreadyPresent => "Already present",
            StatusKind::RuntimeError => "Runtime error",
            StatusKind::NetworkError => "Network error",
            StatusKind::IllegalState => "Illegal state",
            StatusKind::Aborted => "Aborted",
            StatusKind::ServiceUnavailable => "Service unavailable",
            StatusKind::TimedOut => "Timed out",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error kind and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    kind: StatusKind,
    message: String,
}

impl Status {
    /// Create a status with an explicit kind.
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusKind::NotFound, message)
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Corruption, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(StatusKind::NotSupported, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusKind::InvalidArgument, message)
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::IoError, message)
    }

    pub fn already_present(message: impl Into<String>) -> Self {
        Self::new(StatusKind::AlreadyPresent, message)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::RuntimeError, message)
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::NetworkError, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(StatusKind::IllegalState, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Aborted, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusKind::ServiceUnavailable, message)
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(StatusKind::TimedOut, message)
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    /// The message exactly as the handler supplied it. This is what the
    /// remote caller sees as the envelope text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(Status::not_found("m").kind(), StatusKind::NotFound);
        assert_eq!(Status::io_error("m").kind(), StatusKind::IoError);
        assert_eq!(Status::aborted("m").kind(), StatusKind::Aborted);
        assert_eq!(Status::timed_out("m").kind(), StatusKind::TimedOut);
        assert_eq!(
            Status::service_unavailable("m").kind(),
            StatusKind::ServiceUnavailable
        );
    }

    #[test]
    fn test_message_is_verbatim() {
        let status = Status::io_error("disk full");
        assert_eq!(status.message(), "disk full");
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::io_error("disk full").to_string(), "IO error: disk full");
        assert_eq!(Status::corruption("").to_string(), "Corruption");
    }
}
