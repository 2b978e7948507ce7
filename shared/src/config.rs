//! Core configuration, read from TOML and overridable through the
//! environment.
//!
//! ```toml
//! [backend]
//! server_url = "https://api.example.org"
//! request_timeout_ms = 30000
//!
//! [capture]
//! aspect_ratio = "4:3"
//! quality = 70
//!
//! [logging]
//! filter = "vocalx_core=info"
//! ansi = false
//!
//! [simulation]
//! submission_delay_ms = 2000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::capabilities::{
    AspectRatio, CaptureConfig, HttpError, LocationAccuracy, ValidatedUrl, MAX_TIMEOUT_MS,
};
use crate::{AppError, ErrorKind, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SIMULATED_DELAY_MS};

pub const SERVER_URL_ENV: &str = "VOCALX_SERVER_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "VOCALX_REQUEST_TIMEOUT_MS";
pub const LOG_FILTER_ENV: &str = "VOCALX_LOG";

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_LOG_FILTER: &str = "info";

const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
const MAX_SIMULATED_DELAY_MS: u64 = 60_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("config invalid: {0}")]
    Invalid(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, "The app is misconfigured.")
            .with_internal(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub server_url: String,
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_ms: u64::try_from(DEFAULT_REQUEST_TIMEOUT.as_millis())
                .unwrap_or(MAX_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSection {
    pub aspect_ratio: AspectRatio,
    pub quality: u8,
    pub allows_editing: bool,
    pub location_accuracy: LocationAccuracy,
}

impl Default for CaptureSection {
    fn default() -> Self {
        let capture = CaptureConfig::default();
        Self {
            aspect_ratio: capture.aspect_ratio,
            quality: capture.quality,
            allows_editing: capture.allows_editing,
            location_accuracy: LocationAccuracy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives. Empty (the default) defers to `RUST_LOG`,
    /// then to [`DEFAULT_LOG_FILTER`].
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: String::new(),
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub submission_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            submission_delay_ms: DEFAULT_SIMULATED_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub capture: CaptureSection,
    pub logging: LoggingConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Parses and validates a TOML document. Missing sections take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or invalid.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, then applies `VOCALX_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`AppConfig::load`] with an injectable environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bytes = std::fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(
                "config file exceeds size limit".to_string(),
            ));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overrides fields from `VOCALX_SERVER_URL`, `VOCALX_REQUEST_TIMEOUT_MS`
    /// and `VOCALX_LOG`. Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the timeout is not a number.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = read(SERVER_URL_ENV) {
            self.backend.server_url = url.trim().to_string();
        }
        if let Some(timeout) = read(REQUEST_TIMEOUT_ENV) {
            self.backend.request_timeout_ms = timeout.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{REQUEST_TIMEOUT_ENV} must be an integer"))
            })?;
        }
        if let Some(filter) = read(LOG_FILTER_ENV) {
            self.logging.filter = filter;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server_url()?;
        if self.backend.request_timeout_ms == 0 || self.backend.request_timeout_ms > MAX_TIMEOUT_MS
        {
            return Err(ConfigError::Invalid(format!(
                "backend.request_timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        if !(1..=100).contains(&self.capture.quality) {
            return Err(ConfigError::Invalid(
                "capture.quality must be between 1 and 100".to_string(),
            ));
        }
        if !self.logging.filter.trim().is_empty() {
            tracing_subscriber::EnvFilter::try_new(&self.logging.filter)
                .map_err(|err| ConfigError::Invalid(format!("logging.filter: {err}")))?;
        }
        if self.simulation.submission_delay_ms > MAX_SIMULATED_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "simulation.submission_delay_ms must not exceed {MAX_SIMULATED_DELAY_MS}"
            )));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the backend URL is unusable.
    pub fn server_url(&self) -> Result<ValidatedUrl, ConfigError> {
        ValidatedUrl::new(self.backend.server_url.as_str())
            .map_err(|err: HttpError| ConfigError::Invalid(format!("backend.server_url: {err}")))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.request_timeout_ms)
    }

    #[must_use]
    pub fn capture_config(&self) -> CaptureConfig {
        let config = CaptureConfig::default()
            .with_aspect_ratio(self.capture.aspect_ratio)
            .with_quality(self.capture.quality);
        if self.capture.allows_editing {
            config
        } else {
            config.without_editing()
        }
    }

    #[must_use]
    pub fn location_accuracy(&self) -> LocationAccuracy {
        self.capture.location_accuracy
    }

    #[must_use]
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulation.submission_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_empty_document_uses_defaults() {
            let config = AppConfig::from_toml_str("").unwrap();
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.request_timeout(), Duration::from_secs(30));
            assert_eq!(config.simulated_delay(), Duration::from_millis(2000));
            assert_eq!(config.capture_config(), CaptureConfig::default());
            assert_eq!(config.location_accuracy(), LocationAccuracy::High);
            assert!(config.logging.filter.is_empty());
        }

        #[test]
        fn test_partial_sections() {
            let config = AppConfig::from_toml_str(
                r#"
                [backend]
                server_url = "https://city.example.org"

                [capture]
                aspect_ratio = "16:9"
                quality = 85
                allows_editing = false
                "#,
            )
            .unwrap();
            assert_eq!(
                config.server_url().unwrap().as_str(),
                ValidatedUrl::new("https://city.example.org").unwrap().as_str()
            );
            let capture = config.capture_config();
            assert_eq!(capture.aspect_ratio, AspectRatio::Ratio16x9);
            assert_eq!(capture.quality, 85);
            assert!(!capture.allows_editing);
            assert_eq!(config.logging, LoggingConfig::default());
        }

        #[test]
        fn test_unknown_keys_rejected() {
            let err = AppConfig::from_toml_str("[backend]\nserver = \"x\"").unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
        }

        #[test]
        fn test_invalid_values_rejected() {
            let cases = [
                "[backend]\nserver_url = \"ftp://files.example.org\"",
                "[backend]\nrequest_timeout_ms = 0",
                "[capture]\nquality = 0",
                "[logging]\nfilter = \"vocalx_core=loud\"",
                "[simulation]\nsubmission_delay_ms = 600000",
            ];
            for case in cases {
                let err = AppConfig::from_toml_str(case).unwrap_err();
                assert!(matches!(err, ConfigError::Invalid(_)), "{case}: {err}");
            }
        }

        #[test]
        fn test_config_error_maps_to_configuration_kind() {
            let err: AppError = ConfigError::Invalid("bad".into()).into();
            assert_eq!(err.kind, ErrorKind::Configuration);
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_overrides_applied() {
            let mut config = AppConfig::default();
            config
                .apply_env_overrides(env(&[
                    (SERVER_URL_ENV, " https://override.example.org "),
                    (REQUEST_TIMEOUT_ENV, "5000"),
                    (LOG_FILTER_ENV, "vocalx_core=debug"),
                ]))
                .unwrap();
            assert_eq!(config.backend.server_url, "https://override.example.org");
            assert_eq!(config.backend.request_timeout_ms, 5000);
            assert_eq!(config.logging.filter, "vocalx_core=debug");
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_blank_values_ignored() {
            let mut config = AppConfig::default();
            config
                .apply_env_overrides(env(&[(SERVER_URL_ENV, "  "), (LOG_FILTER_ENV, "")]))
                .unwrap();
            assert_eq!(config, AppConfig::default());
        }

        #[test]
        fn test_non_numeric_timeout_rejected() {
            let mut config = AppConfig::default();
            let err = config
                .apply_env_overrides(env(&[(REQUEST_TIMEOUT_ENV, "soon")]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_load_from_file_with_overrides() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[simulation]\nsubmission_delay_ms = 10").unwrap();

            let config = AppConfig::load_with(
                file.path(),
                env(&[(SERVER_URL_ENV, "https://env.example.org")]),
            )
            .unwrap();
            assert_eq!(config.simulation.submission_delay_ms, 10);
            assert_eq!(config.backend.server_url, "https://env.example.org");
        }

        #[test]
        fn test_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let err = AppConfig::load_with(&dir.path().join("absent.toml"), env(&[])).unwrap_err();
            assert!(matches!(err, ConfigError::Io(_)));
        }

        #[test]
        fn test_oversized_file_rejected() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            let padding = "#".repeat(MAX_CONFIG_FILE_SIZE + 1);
            file.write_all(padding.as_bytes()).unwrap();
            let err = AppConfig::load_with(file.path(), env(&[])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }

        #[test]
        fn test_env_override_validated_after_load() {
            let file = tempfile::NamedTempFile::new().unwrap();
            let err = AppConfig::load_with(file.path(), env(&[(REQUEST_TIMEOUT_ENV, "999999999")]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }
    }
}
