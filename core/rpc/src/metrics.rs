// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-method completion metrics.

use std::time::Duration;

use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{KeyValue, global};

use crate::call::CompletionKind;

/// Instruments for one service method.
///
/// Built once per method by the dispatch layer and cloned into every context
/// for that method (the instruments themselves are reference-counted).
/// Completion records exactly one data point, labeled with the outcome.
#[derive(Clone)]
pub struct MethodMetrics {
    service: String,
    method: String,
    completions: Counter<u64>,
    handler_latency: Histogram<u64>,
}

impl MethodMetrics {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        let meter = global::meter("quill_rpc");
        Self {
            service: service.into(),
            method: method.into(),
            completions: meter
                .u64_counter("rpc.server.completions")
                .with_description("Completed calls per method and outcome")
                .build(),
            handler_latency: meter
                .u64_histogram("rpc.server.handler_latency")
                .with_unit("us")
                .with_description("Time from request decode to completion")
                .build(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn record(&self, kind: CompletionKind, elapsed: Duration) {
        let attributes = [
            KeyValue::new("rpc.service", self.service.clone()),
            KeyValue::new("rpc.method", self.method.clone()),
            KeyValue::new("rpc.outcome", kind.as_str()),
        ];
        self.completions.add(1, &attributes);
        self.handler_latency
            .record(elapsed.as_micros() as u64, &attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_accessors() {
        let metrics = MethodMetrics::new("TabletService", "Write");
        assert_eq!(metrics.service(), "TabletService");
        assert_eq!(metrics.method(), "Write");
    }

    #[test]
    fn test_record_with_noop_meter() {
        // No meter provider installed in tests; recording must still be safe.
        let metrics = MethodMetrics::new("TabletService", "Write");
        metrics.record(CompletionKind::Success, Duration::from_micros(250));
        metrics.record(CompletionKind::Failure, Duration::ZERO);
    }
}
