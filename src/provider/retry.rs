//! Retry pacing for provider calls
//!
//! The orchestrator drives its own attempt loop so every attempt can be
//! recorded; this module only decides whether an error deserves another
//! attempt on the same provider and how long to back off before it.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::errors::AgentError;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_MAX_DELAY_MS: u64 = 2_000;

/// Backoff policy shared by both providers
#[derive(Debug, Clone)]
pub struct RetryManager {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    enable_jitter: bool,
}

impl RetryManager {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64, enable_jitter: bool) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            enable_jitter,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.base_delay_ms,
            config.max_delay_ms,
            config.enable_jitter,
        )
    }

    /// Extra attempts allowed on one provider after its first failure
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Binary exponential backoff with an upper cap, jittered by +/-25%
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        let capped = exponential.min(self.max_delay_ms);

        let millis = if self.enable_jitter && capped > 0 {
            let jitter_span = capped / 4;
            let low = capped.saturating_sub(jitter_span);
            let high = capped.saturating_add(jitter_span);
            rand::thread_rng().gen_range(low..=high)
        } else {
            capped
        };

        Duration::from_millis(millis)
    }

    /// Transient faults get another attempt; rate limits do not, they
    /// hand over to the fallback provider instead
    pub fn is_retryable(&self, error: &AgentError) -> bool {
        matches!(
            error,
            AgentError::Unavailable { .. }
                | AgentError::Timeout { .. }
                | AgentError::MalformedResponse { .. }
                | AgentError::HttpError(_)
        )
    }
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS, true)
    }
}
