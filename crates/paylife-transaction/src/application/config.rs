//! Aggregate handle configuration.

use std::time::Duration;

use thiserror::Error;

use super::retry::RetryPolicy;

/// Environment variable holding the history read timeout in milliseconds.
pub const READ_TIMEOUT_ENV: &str = "PAYLIFE_READ_TIMEOUT_MS";
/// Environment variable holding the append timeout in milliseconds.
pub const APPEND_TIMEOUT_ENV: &str = "PAYLIFE_APPEND_TIMEOUT_MS";
/// Environment variable holding the maximum number of retries.
pub const MAX_RETRIES_ENV: &str = "PAYLIFE_MAX_RETRIES";
/// Environment variable holding the initial backoff delay in milliseconds.
pub const RETRY_INITIAL_DELAY_ENV: &str = "PAYLIFE_RETRY_INITIAL_DELAY_MS";
/// Environment variable holding the backoff cap in milliseconds.
pub const RETRY_MAX_DELAY_ENV: &str = "PAYLIFE_RETRY_MAX_DELAY_MS";

/// A configuration value could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is set but cannot be parsed.
    #[error("configuration error: {var} is invalid: {message}")]
    Invalid {
        /// The offending variable.
        var: &'static str,
        /// Why it was rejected.
        message: String,
    },
}

/// Timeouts and retry policy for event log I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleConfig {
    /// Upper bound for loading a transaction's history.
    pub read_timeout: Duration,
    /// Upper bound for a conditional append.
    pub append_timeout: Duration,
    /// Retry policy for `ConcurrencyConflict` and `LogUnavailable`.
    pub retry: RetryPolicy,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            append_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl HandleConfig {
    /// Reads configuration from the process environment. Unset variables
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is present but
    /// unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let millis = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse(&lookup, var)?.map_or(default, Duration::from_millis))
        };

        let retry = RetryPolicy::builder()
            .max_retries(parse(&lookup, MAX_RETRIES_ENV)?.unwrap_or(defaults.retry.max_retries))
            .initial_delay(millis(RETRY_INITIAL_DELAY_ENV, defaults.retry.initial_delay)?)
            .max_delay(millis(RETRY_MAX_DELAY_ENV, defaults.retry.max_delay)?)
            .build();

        Ok(Self {
            read_timeout: millis(READ_TIMEOUT_ENV, defaults.read_timeout)?,
            append_timeout: millis(APPEND_TIMEOUT_ENV, defaults.append_timeout)?,
            retry,
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                message: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_unset_variables_keep_defaults() {
        let config = HandleConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, HandleConfig::default());
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = HandleConfig::from_lookup(lookup(&[
            (READ_TIMEOUT_ENV, "250"),
            (APPEND_TIMEOUT_ENV, "750"),
            (MAX_RETRIES_ENV, "7"),
            (RETRY_INITIAL_DELAY_ENV, "20"),
            (RETRY_MAX_DELAY_ENV, " 1000 "),
        ]))
        .unwrap();

        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.append_timeout, Duration::from_millis(750));
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(20));
        assert_eq!(config.retry.max_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_unparsable_variable_is_rejected() {
        let result = HandleConfig::from_lookup(lookup(&[(MAX_RETRIES_ENV, "many")]));

        match result {
            Err(ConfigError::Invalid { var, .. }) => assert_eq!(var, MAX_RETRIES_ENV),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
