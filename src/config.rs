//! Reasoner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Configuration for a [`SharedReasoner`](crate::SharedReasoner).
///
/// # Examples
///
/// ```
/// use schemaguard::ReasonerConfig;
///
/// let config = ReasonerConfig::from_json(r#"{ "version": 7, "lock_timeout_ms": 500 }"#).unwrap();
/// assert_eq!(config.version, Some(7));
/// assert_eq!(config.lock_timeout().unwrap().as_millis(), 500);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReasonerConfig {
    /// External version label. `None` means unversioned.
    pub version: Option<u64>,
    /// Maximum time to wait for the lock. `None` waits indefinitely.
    pub lock_timeout_ms: Option<u64>,
}

impl ReasonerConfig {
    /// Sets the version label.
    #[must_use]
    pub const fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Bounds lock acquisition. Partial milliseconds round up, so any
    /// positive timeout stays positive.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.lock_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` for a zero lock timeout.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lock_timeout_ms == Some(0) {
            return Err(ValidationError::InvalidConfig {
                reason: "lock_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if the JSON is malformed or
    /// fails [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unversioned_and_unbounded() {
        let config = ReasonerConfig::default();
        assert_eq!(config.version, None);
        assert_eq!(config.lock_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ReasonerConfig::default()
            .with_version(3)
            .with_lock_timeout(Duration::from_millis(1500));
        assert_eq!(config.version, Some(3));
        assert_eq!(config.lock_timeout_ms, Some(1500));
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let config = ReasonerConfig::default().with_lock_timeout(Duration::from_micros(500));
        assert_eq!(config.lock_timeout_ms, Some(1));
        assert!(config.validate().is_ok());

        let config = ReasonerConfig::default().with_lock_timeout(Duration::from_micros(1500));
        assert_eq!(config.lock_timeout_ms, Some(2));

        let config = ReasonerConfig::default().with_lock_timeout(Duration::from_nanos(1));
        assert_eq!(config.lock_timeout_ms, Some(1));
    }

    #[test]
    fn test_from_json_partial_and_empty() {
        let config = ReasonerConfig::from_json(r#"{ "version": 2 }"#).unwrap();
        assert_eq!(config.version, Some(2));
        assert_eq!(config.lock_timeout_ms, None);

        assert_eq!(ReasonerConfig::from_json("{}").unwrap(), ReasonerConfig::default());
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        let err = ReasonerConfig::from_json(r#"{ "lock_timeout_ms": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("must be positive"));

        let err = ReasonerConfig::from_json(r#"{ "versoin": 1 }"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));
    }
}
