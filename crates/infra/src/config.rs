//! Ledger configuration, read from the environment.

use std::time::Duration;

use crate::retry::RetryPolicy;

pub const MAX_CONFLICT_RETRIES_VAR: &str = "STOCKROOM_MAX_CONFLICT_RETRIES";
pub const RETRY_BASE_DELAY_MS_VAR: &str = "STOCKROOM_RETRY_BASE_DELAY_MS";
pub const RECENT_ACTIVITY_LIMIT_VAR: &str = "STOCKROOM_RECENT_ACTIVITY_LIMIT";
pub const READ_MODEL_SYNC_SECS_VAR: &str = "STOCKROOM_READ_MODEL_SYNC_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Attempts at a conflicting write before `ConcurrentUpdateConflict`.
    pub max_conflict_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Movements shown in the dashboard activity feed.
    pub recent_activity_limit: usize,
    /// How often read models pull commits made by other processes. `None` disables it.
    pub read_model_sync_interval: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 5,
            retry_base_delay: Duration::from_millis(2),
            retry_max_delay: Duration::from_millis(50),
            recent_activity_limit: 10,
            read_model_sync_interval: Some(Duration::from_secs(5)),
        }
    }
}

impl LedgerConfig {
    /// Defaults overridden by whichever variables are set. Unparsable values are
    /// logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let max_conflict_retries = match parse_var::<u32>(&lookup, MAX_CONFLICT_RETRIES_VAR) {
            Some(0) => {
                tracing::warn!("{MAX_CONFLICT_RETRIES_VAR}=0 would refuse every write; using 1");
                1
            }
            Some(n) => n,
            None => defaults.max_conflict_retries,
        };

        let retry_base_delay = parse_var(&lookup, RETRY_BASE_DELAY_MS_VAR)
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_base_delay);

        let recent_activity_limit =
            parse_var(&lookup, RECENT_ACTIVITY_LIMIT_VAR).unwrap_or(defaults.recent_activity_limit);

        let read_model_sync_interval = match parse_var::<u64>(&lookup, READ_MODEL_SYNC_SECS_VAR) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.read_model_sync_interval,
        };

        Self {
            max_conflict_retries,
            retry_base_delay,
            retry_max_delay: defaults.retry_max_delay.max(retry_base_delay),
            recent_activity_limit,
            read_model_sync_interval,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_conflict_retries, self.retry_base_delay, self.retry_max_delay)
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
