use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::KeyAuthorizationError;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// The same delay before every retry
    Fixed,
    /// The delay doubles with each retry
    #[default]
    Exponential,
}

/// Tuning for [`crate::KeyAuthorizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationSettings {
    /// Attempts per channel when metadata keeps changing underneath us
    /// (default: 3)
    pub max_attempts: usize,

    /// Delay before the first retry, in milliseconds (default: 50)
    pub retry_backoff_millis: u64,

    /// How the delay grows between retries (default: exponential)
    pub backoff: Backoff,

    /// Metadata item that holds authorized keys (default: "ssh-keys")
    pub metadata_key: String,
}

impl Default for AuthorizationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_millis: 50,
            backoff: Backoff::Exponential,
            metadata_key: "ssh-keys".to_string(),
        }
    }
}

impl AuthorizationSettings {
    /// Set the number of attempts per channel
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base retry delay
    pub fn with_retry_backoff(mut self, delay: Duration) -> Self {
        self.retry_backoff_millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set how the retry delay grows
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the metadata item that holds authorized keys
    pub fn with_metadata_key(mut self, metadata_key: impl Into<String>) -> Self {
        self.metadata_key = metadata_key.into();
        self
    }

    /// Check that the settings can be used.
    pub fn validate(&self) -> Result<(), KeyAuthorizationError> {
        if self.max_attempts == 0 {
            return Err(KeyAuthorizationError::InvalidArgument(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.metadata_key.trim().is_empty() {
            return Err(KeyAuthorizationError::InvalidArgument(
                "metadata_key must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay_before_retry(&self, retry: usize) -> Duration {
        let base = Duration::from_millis(self.retry_backoff_millis);
        match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential => {
                let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX);
                base.saturating_mul(2u32.saturating_pow(exponent))
            }
        }
    }
}
