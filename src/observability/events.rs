//! Observability events for rulegate
//!
//! Every log line the advisor and the index lifecycle emit names one of
//! these events. Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Advice
    /// Query families extracted from an iteration
    QueryFamiliesExtracted,
    /// Index advice computed
    AdviceComputed,
    /// Advice rejected because a rule AST is invalid
    AdviceRejected,
    /// Caller not allowed to prepare indexes for the organization
    AuthorizationDenied,

    // Lifecycle
    /// Index creation job placed on the tenant queue
    CreationEnqueued,
    /// Index creation handed to the catalog
    CreationSubmitted,
    /// Some requested indexes are still being built
    StatusPending,
    /// Every requested index is built and valid
    CreationComplete,
    /// Missing indexes submitted again
    CreationResubmitted,
    /// Indexes still missing after the last resubmission
    CreationFailed,
    /// A job returned an error to the queue
    JobFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::QueryFamiliesExtracted => "QUERY_FAMILIES_EXTRACTED",
            Event::AdviceComputed => "INDEX_ADVICE_COMPUTED",
            Event::AdviceRejected => "INDEX_ADVICE_REJECTED",
            Event::AuthorizationDenied => "INDEX_AUTHORIZATION_DENIED",

            Event::CreationEnqueued => "INDEX_CREATION_ENQUEUED",
            Event::CreationSubmitted => "INDEX_CREATION_SUBMITTED",
            Event::StatusPending => "INDEX_STATUS_PENDING",
            Event::CreationComplete => "INDEX_CREATION_COMPLETE",
            Event::CreationResubmitted => "INDEX_CREATION_RESUBMITTED",
            Event::CreationFailed => "INDEX_CREATION_FAILED",
            Event::JobFailed => "INDEX_JOB_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::AdviceRejected | Event::AuthorizationDenied | Event::CreationResubmitted => {
                Severity::Warn
            }
            Event::CreationFailed | Event::JobFailed => Severity::Error,
            Event::StatusPending => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_unique() {
        let events = [
            Event::ConfigLoaded,
            Event::QueryFamiliesExtracted,
            Event::AdviceComputed,
            Event::AdviceRejected,
            Event::AuthorizationDenied,
            Event::CreationEnqueued,
            Event::CreationSubmitted,
            Event::StatusPending,
            Event::CreationComplete,
            Event::CreationResubmitted,
            Event::CreationFailed,
            Event::JobFailed,
        ];
        let mut names: Vec<_> = events.iter().map(Event::as_str).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), events.len());
    }

    #[test]
    fn test_failures_are_errors() {
        assert_eq!(Event::CreationFailed.severity(), Severity::Error);
        assert_eq!(Event::AdviceComputed.severity(), Severity::Info);
    }
}
