//! Lifecycle Configuration
//!
//! Delays and queue options of the index creation and verification jobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{LifecycleError, LifecycleResult};

/// Index lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Delay between status checks while indexes are building (default: 30s)
    #[serde(default = "default_status_check_delay_ms")]
    pub status_check_delay_ms: u64,

    /// Delay before resubmitting indexes that failed to build (default: 60s)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Queue priority of index jobs (default: 1)
    #[serde(default = "default_job_priority")]
    pub job_priority: i16,

    /// How many times missing indexes are resubmitted (default: 1)
    #[serde(default = "default_max_resubmissions")]
    pub max_resubmissions: u32,
}

fn default_status_check_delay_ms() -> u64 {
    30_000
}

fn default_retry_delay_ms() -> u64 {
    60_000
}

fn default_job_priority() -> i16 {
    1
}

fn default_max_resubmissions() -> u32 {
    1
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            status_check_delay_ms: default_status_check_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            job_priority: default_job_priority(),
            max_resubmissions: default_max_resubmissions(),
        }
    }
}

impl LifecycleConfig {
    /// Rejects settings that would make the status job spin
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.status_check_delay_ms == 0 {
            return Err(LifecycleError::Config(
                "status_check_delay_ms must be > 0".into(),
            ));
        }
        if self.retry_delay_ms == 0 {
            return Err(LifecycleError::Config("retry_delay_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Status check delay as a Duration
    pub fn status_check_delay(&self) -> Duration {
        Duration::from_millis(self.status_check_delay_ms)
    }

    /// Retry delay as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
