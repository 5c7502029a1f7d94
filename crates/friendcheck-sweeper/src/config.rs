use friendcheck_core::{RetentionPolicy, DEFAULT_RETENTION_FLOOR};
use std::time::Duration;

/// Sweeper configuration, loaded from environment variables.
pub struct Config {
    /// Collections kept per run (default: 5).
    pub floor: usize,
    /// Run repeatedly at this interval instead of once.
    pub interval: Option<Duration>,
    /// Wait for straggler deletions before exiting.
    ///
    /// Off by default. A one-shot run then confirms only the first
    /// successful deletion; the rest are cut short when the process exits
    /// and are retried by the next run.
    pub settle: bool,
}

impl Config {
    /// Load configuration from `FRIENDCHECK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            floor: lookup("FRIENDCHECK_RETENTION_FLOOR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETENTION_FLOOR),
            interval: lookup("FRIENDCHECK_SWEEP_INTERVAL_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            settle: lookup("FRIENDCHECK_SWEEP_SETTLE")
                .map(|v| v != "0" && !v.is_empty())
                .unwrap_or(false),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy { floor: self.floor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.floor, 5);
        assert!(config.interval.is_none());
        assert!(!config.settle);
    }

    #[test]
    fn test_settle_values() {
        let settle = |v: &str| {
            let v = v.to_string();
            Config::from_lookup(move |k| (k == "FRIENDCHECK_SWEEP_SETTLE").then(|| v.clone())).settle
        };
        assert!(settle("1"));
        assert!(settle("true"));
        assert!(!settle("0"));
        assert!(!settle(""));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(|k| match k {
            "FRIENDCHECK_RETENTION_FLOOR" => Some("10".into()),
            "FRIENDCHECK_SWEEP_INTERVAL_SECS" => Some("86400".into()),
            "FRIENDCHECK_SWEEP_SETTLE" => Some("1".into()),
            _ => None,
        });
        assert_eq!(config.policy().floor, 10);
        assert_eq!(config.interval, Some(Duration::from_secs(86_400)));
        assert!(config.settle);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = Config::from_lookup(|k| match k {
            "FRIENDCHECK_RETENTION_FLOOR" => Some("many".into()),
            "FRIENDCHECK_SWEEP_INTERVAL_SECS" => Some("0".into()),
            "FRIENDCHECK_SWEEP_SETTLE" => Some("0".into()),
            _ => None,
        });
        assert_eq!(config.floor, DEFAULT_RETENTION_FLOOR);
        assert!(config.interval.is_none());
        assert!(!config.settle);
    }
}
