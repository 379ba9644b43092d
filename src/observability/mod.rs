//! Observability subsystem for rulegate
//!
//! - Structured logging (JSON lines)
//! - Atomic counters
//! - Scoped begin/complete tracing
//!
//! Observability is read-only: it never changes what the advisor computes,
//! and a failed log write never fails the caller.
//!
//! ```ignore
//! use rulegate::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::CreationEnqueued, &[("org_id", "..."), ("count", "2")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{AdvisorMetrics, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
