use chrono::Duration;
use thiserror::Error;

pub const DEFAULT_CACHE_TTL_SECS: u32 = 300;
pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 60.0;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

pub const ENV_CACHE_TTL_SECS: &str = "TUTOR_CACHE_TTL_SECS";
pub const ENV_ACCURACY_THRESHOLD: &str = "TUTOR_ACCURACY_THRESHOLD";
pub const ENV_EVENT_CAPACITY: &str = "TUTOR_EVENT_CAPACITY";

/// Tunables for the metrics core.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsSettings {
    cache_ttl_secs: u32,
    default_accuracy_threshold: f64,
    event_capacity: usize,
}

/// Unvalidated settings; `None` fields fall back to defaults.
#[derive(Clone, Debug, Default)]
pub struct MetricsSettingsDraft {
    pub cache_ttl_secs: Option<u32>,
    pub default_accuracy_threshold: Option<f64>,
    pub event_capacity: Option<usize>,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MetricsSettingsError {
    #[error("cache TTL must be > 0 seconds")]
    InvalidCacheTtl,

    #[error("accuracy threshold must be within 0..=100, got {0}")]
    InvalidAccuracyThreshold(f64),

    #[error("event capacity must be > 0")]
    InvalidEventCapacity,

    #[error("invalid value for {var}: {raw:?}")]
    InvalidEnv { var: &'static str, raw: String },
}

impl MetricsSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from `TUTOR_*` environment variables.
    ///
    /// Unset or blank variables leave the field empty.
    ///
    /// # Errors
    ///
    /// Returns `MetricsSettingsError::InvalidEnv` when a variable is set but unparsable.
    pub fn from_env() -> Result<Self, MetricsSettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`Self::from_env`] with an injectable lookup.
    ///
    /// # Errors
    ///
    /// Returns `MetricsSettingsError::InvalidEnv` when a value is present but unparsable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MetricsSettingsError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        Ok(Self {
            cache_ttl_secs: parse_var(&lookup, ENV_CACHE_TTL_SECS)?,
            default_accuracy_threshold: parse_var(&lookup, ENV_ACCURACY_THRESHOLD)?,
            event_capacity: parse_var(&lookup, ENV_EVENT_CAPACITY)?,
        })
    }

    /// Validate and fill defaults.
    ///
    /// # Errors
    ///
    /// Returns `MetricsSettingsError` if any value is out of range.
    pub fn validate(self) -> Result<MetricsSettings, MetricsSettingsError> {
        let cache_ttl_secs = self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS);
        if cache_ttl_secs == 0 {
            return Err(MetricsSettingsError::InvalidCacheTtl);
        }

        let threshold = self
            .default_accuracy_threshold
            .unwrap_or(DEFAULT_ACCURACY_THRESHOLD);
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(MetricsSettingsError::InvalidAccuracyThreshold(threshold));
        }

        let event_capacity = self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY);
        if event_capacity == 0 {
            return Err(MetricsSettingsError::InvalidEventCapacity);
        }

        Ok(MetricsSettings {
            cache_ttl_secs,
            default_accuracy_threshold: threshold,
            event_capacity,
        })
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, MetricsSettingsError>
where
    T: std::str::FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var).map(|raw| raw.trim().to_owned()) {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| MetricsSettingsError::InvalidEnv { var, raw }),
    }
}

impl MetricsSettings {
    #[must_use]
    pub fn cache_ttl_secs(&self) -> u32 {
        self.cache_ttl_secs
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::seconds(i64::from(self.cache_ttl_secs))
    }

    #[must_use]
    pub fn default_accuracy_threshold(&self) -> f64 {
        self.default_accuracy_threshold
    }

    #[must_use]
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            default_accuracy_threshold: DEFAULT_ACCURACY_THRESHOLD,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
