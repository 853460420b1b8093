//! Metrics definitions for the extractor.

use shared::metrics_defs::{MetricDef, MetricType};

pub const MESSAGES_RECEIVED: MetricDef = MetricDef {
    name: "extractor.messages.received",
    metric_type: MetricType::Counter,
    description: "Number of messages received from the queue",
};

pub const MESSAGES_MATCHED: MetricDef = MetricDef {
    name: "extractor.messages.matched",
    metric_type: MetricType::Counter,
    description: "Number of messages claimed for the requested correlation id",
};

pub const MESSAGES_DEFERRED: MetricDef = MetricDef {
    name: "extractor.messages.deferred",
    metric_type: MetricType::Counter,
    description: "Number of unmatched messages whose visibility was deferred",
};

pub const MESSAGE_FAILURES: MetricDef = MetricDef {
    name: "extractor.messages.failed",
    metric_type: MetricType::Counter,
    description: "Number of per-message delete or deferral failures",
};

pub const SCAN_DURATION: MetricDef = MetricDef {
    name: "extractor.scan.duration",
    metric_type: MetricType::Histogram,
    description: "Time to scan one page of the queue in seconds",
};

pub const ARCHIVES_WRITTEN: MetricDef = MetricDef {
    name: "extractor.archives.written",
    metric_type: MetricType::Counter,
    description: "Number of archive objects written",
};

pub const NOTIFICATIONS_FAILED: MetricDef = MetricDef {
    name: "extractor.notifications.failed",
    metric_type: MetricType::Counter,
    description: "Number of notifications that could not be delivered",
};

pub const ALL_METRICS: &[MetricDef] = &[
    MESSAGES_RECEIVED,
    MESSAGES_MATCHED,
    MESSAGES_DEFERRED,
    MESSAGE_FAILURES,
    SCAN_DURATION,
    ARCHIVES_WRITTEN,
    NOTIFICATIONS_FAILED,
];
