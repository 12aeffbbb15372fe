// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Layered configuration
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. `brand-kit.{toml,json,yaml}` in the working directory, if present
//! 3. The file named by `BRAND_KIT_CONFIG` (or passed explicitly), if any
//! 4. Environment variables prefixed with `BRAND_KIT__`, using `__` between
//!    sections, e.g. `BRAND_KIT__API__API_KEY` or `BRAND_KIT__RETRY__MAX_ATTEMPTS`
//!
//! `GROQ_API_KEY` is used when no API key is configured any other way.

use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::ensure;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{BrandKitError, BrandKitResult},
    model::{DEFAULT_BASE_URL, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL},
    retry::RetryPolicy,
    safety::DEFAULT_IMAGE_EXPLICIT_THRESHOLD,
};

/// Environment variable naming an extra configuration file
pub const CONFIG_PATH_ENV: &str = "BRAND_KIT_CONFIG";
/// Environment variable used as the API key fallback
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

const ENV_PREFIX: &str = "BRAND_KIT";
const ENV_SEPARATOR: &str = "__";

/// Model API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key; empty means no model is configured
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API
    pub base_url: Url,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Model used for text-only requests
    pub text_model: String,
    /// Model used for requests carrying images
    pub vision_model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout_seconds: 30,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

impl ApiConfig {
    /// Create API settings with a key and default everything else
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Whether an API key is present
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Validate the API settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.is_configured() && !self.api_key.starts_with("gsk_") {
            warn!("API key doesn't match the expected Groq format (should start with 'gsk_')");
        }

        ensure!(
            (1..=300).contains(&self.timeout_seconds),
            "Invalid timeout: {} seconds (must be 1-300)",
            self.timeout_seconds
        );
        ensure!(
            !self.text_model.trim().is_empty(),
            "text model cannot be empty"
        );
        ensure!(
            !self.vision_model.trim().is_empty(),
            "vision model cannot be empty"
        );

        Ok(())
    }
}

/// Retry settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total tries per model call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,
    /// Maximum random delay added to every wait in milliseconds
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1000,
            max_jitter_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// The retry policy these settings describe
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_jitter_ms),
        )
    }

    /// Validate the retry settings
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=10).contains(&self.max_attempts),
            "Invalid max_attempts: {} (must be 1-10)",
            self.max_attempts
        );
        ensure!(
            (1..=60_000).contains(&self.base_delay_ms),
            "Invalid base_delay_ms: {} (must be 1-60000)",
            self.base_delay_ms
        );
        ensure!(
            self.max_jitter_ms <= 60_000,
            "Invalid max_jitter_ms: {} (must be at most 60000)",
            self.max_jitter_ms
        );
        Ok(())
    }
}

/// Response cache settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default time-to-live in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 30 * 60,
        }
    }
}

impl CacheConfig {
    /// Default time-to-live
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Content safety settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Whether the host can run local classifiers
    pub classifiers_enabled: bool,
    /// Probability above which a local image prediction rejects
    pub image_explicit_threshold: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            classifiers_enabled: false,
            image_explicit_threshold: DEFAULT_IMAGE_EXPLICIT_THRESHOLD,
        }
    }
}

/// Complete brand-kit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandKitConfig {
    /// Model API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,
    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Content safety settings
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl BrandKitConfig {
    /// Load configuration from the default sources
    pub fn load() -> BrandKitResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` in place of `BRAND_KIT_CONFIG`
    pub fn load_from(path: Option<&Path>) -> BrandKitResult<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.or(env_path.as_deref().map(Path::new));
        Self::load_with(path, None)
    }

    /// Load configuration with an optional replacement for the process
    /// environment
    fn load_with(
        path: Option<&Path>,
        environment: Option<HashMap<String, String>>,
    ) -> BrandKitResult<Self> {
        let defaults = ApiConfig::default();

        let mut builder = Config::builder()
            .set_default("api.api_key", "")?
            .set_default("api.base_url", defaults.base_url.as_str())?
            .set_default("api.timeout_seconds", defaults.timeout_seconds)?
            .set_default("api.text_model", defaults.text_model)?
            .set_default("api.vision_model", defaults.vision_model)?
            .set_default("retry.max_attempts", 4)?
            .set_default("retry.base_delay_ms", 1000)?
            .set_default("retry.max_jitter_ms", 1000)?
            .set_default("cache.ttl_seconds", 30 * 60)?
            .set_default("safety.classifiers_enabled", false)?
            .set_default(
                "safety.image_explicit_threshold",
                f64::from(DEFAULT_IMAGE_EXPLICIT_THRESHOLD),
            )?
            .add_source(File::with_name("brand-kit").required(false));

        if let Some(path) = path {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        let api_key_fallback = match &environment {
            Some(vars) => vars.get(API_KEY_ENV).cloned(),
            None => std::env::var(API_KEY_ENV).ok(),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(environment),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if !config.api.is_configured()
            && let Some(key) = api_key_fallback.filter(|k| !k.trim().is_empty())
        {
            debug!("using API key from {}", API_KEY_ENV);
            config.api.api_key = key;
        }
        config.api.api_key = config.api.api_key.trim().to_string();

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> BrandKitResult<()> {
        self.api.validate().map_err(BrandKitError::config)?;
        self.retry.validate().map_err(BrandKitError::config)?;

        if self.cache.ttl_seconds == 0 {
            return Err(BrandKitError::config(
                "Invalid cache ttl_seconds: 0 (must be greater than 0)",
            ));
        }

        if !(0.0..=1.0).contains(&self.safety.image_explicit_threshold) {
            return Err(BrandKitError::config(format!(
                "Invalid image_explicit_threshold: {} (must be 0.0-1.0)",
                self.safety.image_explicit_threshold
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn config_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("brand-kit-test")
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = BrandKitConfig::load_with(None, Some(HashMap::new())).unwrap();

        assert!(!config.api.is_configured());
        assert_eq!(config.api.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.api.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.api.vision_model, DEFAULT_VISION_MODEL);
        assert_eq!(config.retry.policy(), RetryPolicy::default());
        assert_eq!(config.cache.ttl(), Duration::from_secs(1800));
        assert!(!config.safety.classifiers_enabled);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = config_file(
            ".toml",
            r#"
[api]
api_key = "gsk_from_file"
timeout_seconds = 60

[retry]
max_attempts = 2
max_jitter_ms = 0

[safety]
classifiers_enabled = true
image_explicit_threshold = 0.9
"#,
        );

        let config = BrandKitConfig::load_with(Some(file.path()), Some(HashMap::new())).unwrap();

        assert_eq!(config.api.api_key, "gsk_from_file");
        assert_eq!(config.api.timeout_seconds, 60);
        assert_eq!(config.api.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(config.safety.classifiers_enabled);
        assert!((config.safety.image_explicit_threshold - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn environment_overrides_file() {
        let file = config_file(".json", r#"{ "retry": { "max_attempts": 2 } }"#);
        let environment = vars(&[
            ("BRAND_KIT__RETRY__MAX_ATTEMPTS", "6"),
            ("BRAND_KIT__API__TEXT_MODEL", "llama-3.1-8b-instant"),
        ]);

        let config = BrandKitConfig::load_with(Some(file.path()), Some(environment)).unwrap();

        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.api.text_model, "llama-3.1-8b-instant");
    }

    #[test]
    fn api_key_fallback() {
        let environment = vars(&[(API_KEY_ENV, " gsk_fallback ")]);
        let config = BrandKitConfig::load_with(None, Some(environment)).unwrap();
        assert_eq!(config.api.api_key, "gsk_fallback");

        let environment = vars(&[
            (API_KEY_ENV, "gsk_fallback"),
            ("BRAND_KIT__API__API_KEY", "gsk_explicit"),
        ]);
        let config = BrandKitConfig::load_with(None, Some(environment)).unwrap();
        assert_eq!(config.api.api_key, "gsk_explicit");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = config_file(".toml", "[api]\ntimeout_seconds = 500\n");
        let error = BrandKitConfig::load_with(Some(file.path()), Some(HashMap::new())).unwrap_err();
        assert!(matches!(error, BrandKitError::Configuration { .. }));
        assert!(error.to_string().contains("must be 1-300"));

        let missing = BrandKitConfig::load_with(
            Some(Path::new("/non/existent/brand-kit.toml")),
            Some(HashMap::new()),
        );
        assert!(missing.is_err());
    }

    #[test]
    fn section_validation() {
        assert!(ApiConfig::new("gsk_test").validate().is_ok());
        assert!(ApiConfig::new("gsk_test").with_timeout(0).validate().is_err());

        let retry = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(retry.validate().is_err());

        let config = BrandKitConfig {
            safety: SafetyConfig {
                image_explicit_threshold: 1.5,
                ..SafetyConfig::default()
            },
            ..BrandKitConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BrandKitConfig {
            cache: CacheConfig { ttl_seconds: 0 },
            ..BrandKitConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
