//! Mediator settings layered from files and environment variables.

use crate::core::{LoadMode, RetryPolicy, StaleFallback};
use crate::error::{ConfigError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for a [`ConfigMediator`](crate::core::ConfigMediator).
///
/// Every field has a default, so an empty source yields a hybrid mediator with
/// logging off, no retries, and no rate limiting.
///
/// # Examples
///
/// ```yaml
/// load_mode: hybrid
/// logging_enabled: true
/// stale_fallback: use_cache
/// sync_interval_secs: 30
/// retry:
///   max_attempts: 3
///   backoff_ms: 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct MediatorSettings {
    /// Load strategy.
    pub load_mode: LoadMode,
    /// Whether the mediator emits tracing events.
    pub logging_enabled: bool,
    /// What a hybrid load does when a fetch announced as newer returns nothing.
    pub stale_fallback: StaleFallback,
    /// Retry behaviour for remote fetches.
    pub retry: RetrySettings,
    /// Minimum spacing between sync checks for the same key.
    pub sync_interval_secs: Option<u64>,
}

impl MediatorSettings {
    /// Start layering settings sources.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// The sync interval as a duration, if one is set and non-zero.
    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Retry section of [`MediatorSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total fetch attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff in milliseconds.
    pub backoff_ms: u64,
}

impl RetrySettings {
    /// The equivalent [`RetryPolicy`].
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 200,
        }
    }
}

/// Layers settings files and environment variables.
///
/// Files are merged in the order given; later files override earlier ones.
/// Environment variables override all files.
///
/// # Examples
///
/// ```rust,no_run
/// use config_mediator::settings::MediatorSettings;
///
/// # fn example() -> config_mediator::error::Result<()> {
/// // MEDIATOR_LOAD_MODE=remote_only, MEDIATOR_RETRY__MAX_ATTEMPTS=3
/// let settings = MediatorSettings::builder()
///     .with_file("config/mediator.yaml")
///     .with_env_overrides("MEDIATOR", "__")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    files: Vec<PathBuf>,
    env_prefix: Option<String>,
    env_separator: Option<String>,
    env_vars: Option<HashMap<String, String>>,
}

impl SettingsBuilder {
    /// Create a builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a settings file. The format follows the extension: YAML (.yaml, .yml),
    /// TOML (.toml), or JSON (.json).
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Read overrides from environment variables.
    ///
    /// * `prefix` - Prefix for variables (e.g., "MEDIATOR")
    /// * `separator` - Separator for nested keys (e.g., "__" for MEDIATOR_RETRY__BACKOFF_MS)
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.env_separator = Some(separator.to_string());
        self
    }

    /// Read environment overrides from `vars` instead of the process environment.
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// Merge all sources into [`MediatorSettings`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SettingsError`] when a file is missing, has an
    /// unsupported extension, or a value has the wrong type.
    pub fn load(self) -> Result<MediatorSettings> {
        let mut builder = Config::builder();

        for path in &self.files {
            let format = detect_format(path)?;
            builder = builder.add_source(File::from(path.as_path()).format(format));
        }

        if let Some(prefix) = &self.env_prefix {
            let separator = self.env_separator.as_deref().unwrap_or("__");
            let environment = Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator(separator)
                .try_parsing(true)
                .source(self.env_vars.clone());
            builder = builder.add_source(environment);
        }

        let settings = builder.build()?.try_deserialize::<MediatorSettings>()?;
        Ok(settings)
    }
}

fn detect_format(path: &Path) -> Result<FileFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
        Some("toml") => Ok(FileFormat::Toml),
        Some("json") => Ok(FileFormat::Json),
        _ => Err(ConfigError::SettingsError(format!(
            "unsupported settings file: {}",
            path.display()
        ))),
    }
}
