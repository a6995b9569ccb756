use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Tunables of an extraction run, layered Default < File < Environment < Cli
#[derive(Debug, Clone)]
pub struct ExtractSettings {
    pub batch_size: ConfigValue<usize>,
    pub requests_to_pause: ConfigValue<u32>,
    pub pause_seconds: ConfigValue<f64>,
    pub max_attempts: ConfigValue<u32>,
    pub retry_delay: ConfigValue<f64>,
    pub geometry_precision: ConfigValue<i32>,
    pub out_srs: ConfigValue<String>,
    pub request_timeout: ConfigValue<Option<f64>>,
    pub verify_tls: ConfigValue<bool>,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Apply an environment variable if it is set and parses
fn env_override<T>(name: &str, target: &mut ConfigValue<T>, expected: &str)
where
    T: FromStr,
{
    if let Ok(raw) = env::var(name) {
        match raw.trim().parse::<T>() {
            Ok(value) => target.update(value, ConfigSource::Environment),
            Err(_) => tracing::warn!("Invalid {} value '{}': expected {}", name, raw, expected),
        }
    }
}

impl ExtractSettings {
    /// Create settings with default values
    pub fn with_defaults() -> Self {
        Self {
            batch_size: ConfigValue::new(1000, ConfigSource::Default),
            requests_to_pause: ConfigValue::new(10, ConfigSource::Default),
            pause_seconds: ConfigValue::new(2.0, ConfigSource::Default),
            max_attempts: ConfigValue::new(5, ConfigSource::Default),
            retry_delay: ConfigValue::new(5.0, ConfigSource::Default),
            geometry_precision: ConfigValue::new(-1, ConfigSource::Default),
            out_srs: ConfigValue::new("EPSG:4326".to_string(), ConfigSource::Default),
            request_timeout: ConfigValue::new(None, ConfigSource::Default),
            verify_tls: ConfigValue::new(true, ConfigSource::Default),
        }
    }

    /// Load settings from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ExtractError::config("file", format!("Failed to read config file: {}", e)))?;

        let file: FileSettings = toml::from_str(&content)
            .map_err(|e| ExtractError::config("file", format!("Failed to parse TOML: {}", e)))?;

        if let Some(v) = file.batch_size {
            self.batch_size.update(v, ConfigSource::File);
        }
        if let Some(v) = file.requests_to_pause {
            self.requests_to_pause.update(v, ConfigSource::File);
        }
        if let Some(v) = file.pause_seconds {
            self.pause_seconds.update(v, ConfigSource::File);
        }
        if let Some(v) = file.max_attempts {
            self.max_attempts.update(v, ConfigSource::File);
        }
        if let Some(v) = file.retry_delay {
            self.retry_delay.update(v, ConfigSource::File);
        }
        if let Some(v) = file.geometry_precision {
            self.geometry_precision.update(v, ConfigSource::File);
        }
        if let Some(v) = file.out_srs {
            self.out_srs.update(v, ConfigSource::File);
        }
        if let Some(v) = file.request_timeout {
            self.request_timeout.update(Some(v), ConfigSource::File);
        }
        if let Some(v) = file.verify_tls {
            self.verify_tls.update(v, ConfigSource::File);
        }

        self.validate()?;
        Ok(self)
    }

    /// Load settings from `FEATDUMP_*` environment variables.
    ///
    /// Unparseable values are logged and skipped.
    pub fn load_from_env(mut self) -> Self {
        env_override("FEATDUMP_BATCH_SIZE", &mut self.batch_size, "positive integer");
        env_override(
            "FEATDUMP_REQUESTS_TO_PAUSE",
            &mut self.requests_to_pause,
            "non-negative integer",
        );
        env_override("FEATDUMP_PAUSE_SECONDS", &mut self.pause_seconds, "seconds");
        env_override("FEATDUMP_MAX_ATTEMPTS", &mut self.max_attempts, "positive integer");
        env_override("FEATDUMP_RETRY_DELAY", &mut self.retry_delay, "seconds");
        env_override(
            "FEATDUMP_GEOMETRY_PRECISION",
            &mut self.geometry_precision,
            "integer, -1 to disable",
        );
        if let Ok(srs) = env::var("FEATDUMP_OUT_SRS") {
            self.out_srs.update(srs, ConfigSource::Environment);
        }
        if let Ok(raw) = env::var("FEATDUMP_REQUEST_TIMEOUT") {
            match raw.trim().parse::<f64>() {
                Ok(secs) => self.request_timeout.update(Some(secs), ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FEATDUMP_REQUEST_TIMEOUT value '{}': expected seconds",
                    raw
                ),
            }
        }

        self
    }

    /// Update settings from CLI arguments
    pub fn update_from_cli(&mut self, overrides: SettingsOverrides) {
        if let Some(v) = overrides.batch_size {
            self.batch_size.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.requests_to_pause {
            self.requests_to_pause.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.pause_seconds {
            self.pause_seconds.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.max_attempts {
            self.max_attempts.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.retry_delay {
            self.retry_delay.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.geometry_precision {
            self.geometry_precision.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.out_srs {
            self.out_srs.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.request_timeout {
            self.request_timeout.update(Some(v), ConfigSource::Cli);
        }
        if let Some(v) = overrides.verify_tls {
            self.verify_tls.update(v, ConfigSource::Cli);
        }
    }

    /// Check ranges that the individual types cannot express
    pub fn validate(&self) -> Result<()> {
        fn non_negative(key: &str, value: f64) -> Result<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ExtractError::config(key, format!("{} must be a non-negative number", value)))
            }
        }

        if self.batch_size.value == 0 {
            return Err(ExtractError::config("batch_size", "must be at least 1"));
        }
        if self.max_attempts.value == 0 {
            return Err(ExtractError::config("max_attempts", "must be at least 1"));
        }
        if self.geometry_precision.value < -1 {
            return Err(ExtractError::config(
                "geometry_precision",
                "must be -1 (no truncation) or a digit count",
            ));
        }
        non_negative("pause_seconds", self.pause_seconds.value)?;
        non_negative("retry_delay", self.retry_delay.value)?;
        if let Some(timeout) = self.request_timeout.value {
            non_negative("request_timeout", timeout)?;
        }
        Ok(())
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs_f64(self.pause_seconds.value)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay.value)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout.value.map(Duration::from_secs_f64)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> BTreeMap<String, (String, ConfigSource)> {
        fn entry<T: Display>(v: &ConfigValue<T>) -> (String, ConfigSource) {
            (v.value.to_string(), v.source)
        }

        let mut map = BTreeMap::new();
        map.insert("batch_size".to_string(), entry(&self.batch_size));
        map.insert("requests_to_pause".to_string(), entry(&self.requests_to_pause));
        map.insert("pause_seconds".to_string(), entry(&self.pause_seconds));
        map.insert("max_attempts".to_string(), entry(&self.max_attempts));
        map.insert("retry_delay".to_string(), entry(&self.retry_delay));
        map.insert("geometry_precision".to_string(), entry(&self.geometry_precision));
        map.insert("out_srs".to_string(), entry(&self.out_srs));
        map.insert(
            "request_timeout".to_string(),
            (
                self.request_timeout
                    .value
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                self.request_timeout.source,
            ),
        );
        map.insert("verify_tls".to_string(), entry(&self.verify_tls));
        map
    }
}

/// Settings loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    batch_size: Option<usize>,
    requests_to_pause: Option<u32>,
    pause_seconds: Option<f64>,
    max_attempts: Option<u32>,
    retry_delay: Option<f64>,
    geometry_precision: Option<i32>,
    out_srs: Option<String>,
    request_timeout: Option<f64>,
    verify_tls: Option<bool>,
}

/// CLI setting overrides
#[derive(Debug, Default)]
pub struct SettingsOverrides {
    pub batch_size: Option<usize>,
    pub requests_to_pause: Option<u32>,
    pub pause_seconds: Option<f64>,
    pub max_attempts: Option<u32>,
    pub retry_delay: Option<f64>,
    pub geometry_precision: Option<i32>,
    pub out_srs: Option<String>,
    pub request_timeout: Option<f64>,
    pub verify_tls: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = ExtractSettings::with_defaults();
        assert_eq!(settings.batch_size.value, 1000);
        assert_eq!(settings.requests_to_pause.value, 10);
        assert_eq!(settings.max_attempts.value, 5);
        assert_eq!(settings.geometry_precision.value, -1);
        assert_eq!(settings.out_srs.value, "EPSG:4326");
        assert_eq!(settings.timeout(), None);
        assert!(settings.verify_tls.value);
        assert_eq!(settings.batch_size.source, ConfigSource::Default);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
batch_size = 500
pause_seconds = 0.5
out_srs = "EPSG:3857"
request_timeout = 30
verify_tls = false
"#
        )
        .unwrap();

        let settings = ExtractSettings::with_defaults()
            .load_from_file(file.path())
            .unwrap();

        assert_eq!(settings.batch_size.value, 500);
        assert_eq!(settings.batch_size.source, ConfigSource::File);
        assert_eq!(settings.pause(), Duration::from_millis(500));
        assert_eq!(settings.out_srs.value, "EPSG:3857");
        assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
        assert!(!settings.verify_tls.value);
        assert_eq!(settings.max_attempts.source, ConfigSource::Default);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "batch_size = 0").unwrap();
        assert!(ExtractSettings::with_defaults().load_from_file(file.path()).is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "unknown_key = 1").unwrap();
        assert!(ExtractSettings::with_defaults().load_from_file(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        env::set_var("FEATDUMP_BATCH_SIZE", "250");
        env::set_var("FEATDUMP_MAX_ATTEMPTS", "not-a-number");
        env::set_var("FEATDUMP_REQUEST_TIMEOUT", "12.5");

        let settings = ExtractSettings::with_defaults().load_from_env();

        env::remove_var("FEATDUMP_BATCH_SIZE");
        env::remove_var("FEATDUMP_MAX_ATTEMPTS");
        env::remove_var("FEATDUMP_REQUEST_TIMEOUT");

        assert_eq!(settings.batch_size.value, 250);
        assert_eq!(settings.batch_size.source, ConfigSource::Environment);
        assert_eq!(settings.max_attempts.value, 5);
        assert_eq!(settings.max_attempts.source, ConfigSource::Default);
        assert_eq!(settings.timeout(), Some(Duration::from_secs_f64(12.5)));
    }

    #[test]
    #[serial]
    fn test_cli_beats_env() {
        env::set_var("FEATDUMP_GEOMETRY_PRECISION", "4");
        let mut settings = ExtractSettings::with_defaults().load_from_env();
        env::remove_var("FEATDUMP_GEOMETRY_PRECISION");

        settings.update_from_cli(SettingsOverrides {
            geometry_precision: Some(6),
            ..Default::default()
        });

        assert_eq!(settings.geometry_precision.value, 6);
        assert_eq!(settings.geometry_precision.source, ConfigSource::Cli);
        assert_eq!(settings.pause_seconds.source, ConfigSource::Default);
    }

    #[test]
    fn test_validate_ranges() {
        let mut settings = ExtractSettings::with_defaults();
        settings.update_from_cli(SettingsOverrides {
            geometry_precision: Some(-2),
            ..Default::default()
        });
        assert!(settings.validate().is_err());

        let mut settings = ExtractSettings::with_defaults();
        settings.update_from_cli(SettingsOverrides {
            retry_delay: Some(-1.0),
            ..Default::default()
        });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_inspection_map() {
        let map = ExtractSettings::with_defaults().to_inspection_map();
        assert_eq!(map["batch_size"], ("1000".to_string(), ConfigSource::Default));
        assert_eq!(map["request_timeout"].0, "none");
        assert_eq!(map.len(), 9);
    }
}
