//! Orchestration loop limits

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Loop limits and oracle retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of executed steps per run
    #[serde(rename = "max-iterations", default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Retries after the first failed oracle call
    #[serde(rename = "oracle-retries", default = "default_oracle_retries")]
    pub oracle_retries: u32,

    #[serde(rename = "backoff-initial-ms", default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    #[serde(rename = "backoff-max-ms", default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_max_iterations() -> usize {
    64
}

fn default_oracle_retries() -> u32 {
    3
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    8000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            oracle_retries: default_oracle_retries(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl OrchestratorConfig {
    /// Delay before retry number `attempt` (1-based): doubles, then caps
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self.backoff_initial_ms.saturating_mul(factor).min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }
}
