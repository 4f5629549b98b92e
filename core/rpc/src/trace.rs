// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-call diagnostics buffer.
//!
//! One `Trace` is attached to each in-flight call. Handlers append
//! free-form events to it; the transport can dump the buffer when a call is
//! slow or fails. Events are also mirrored to the `tracing` subscriber at
//! trace level.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// One recorded event, stamped with its offset from the call's start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub offset: Duration,
    pub message: String,
}

/// Append-only event buffer shared between the call record and the context.
#[derive(Debug)]
pub struct Trace {
    started: Instant,
    events: Mutex<Vec<TraceEvent>>,
}

impl Trace {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Append an event. Callable from any thread.
    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::trace!(target: "quill_rpc::trace", "{}", message);
        self.events.lock().push(TraceEvent {
            offset: self.started.elapsed(),
            message,
        });
    }

    /// Snapshot of the events recorded so far, in order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Render the buffer, one event per line with its microsecond offset.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for event in self.events.lock().iter() {
            let _ = writeln!(out, "{:>10}us {}", event.offset.as_micros(), event.message);
        }
        out
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let trace = Trace::new();
        trace.record("open tablet");
        trace.record("apply mutation");

        let events = trace.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "open tablet");
        assert_eq!(events[1].message, "apply mutation");
        assert!(events[0].offset <= events[1].offset);
    }

    #[test]
    fn test_dump_one_line_per_event() {
        let trace = Trace::new();
        trace.record("a");
        trace.record("b");
        let dump = trace.dump();
        assert_eq!(dump.lines().count(), 2);
        assert!(dump.lines().next().unwrap().ends_with(" a"));
    }

    #[test]
    fn test_record_from_other_thread() {
        let trace = std::sync::Arc::new(Trace::new());
        let t = std::sync::Arc::clone(&trace);
        std::thread::spawn(move || t.record("worker event"))
            .join()
            .unwrap();
        assert_eq!(trace.events()[0].message, "worker event");
    }
}
