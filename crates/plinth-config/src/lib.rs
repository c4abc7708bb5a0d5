//! Shared host configuration for the Plinth plugin host.
//!
//! Both the engine and the CLI binary read the same [`Config`] so they agree
//! on where packages live, where the registry snapshot is written, and which
//! ceilings apply to plugin invocations. Values come with conservative
//! defaults and serde derives so deployments can layer a configuration file
//! or environment overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod limits;
pub mod logging;

pub use self::limits::InvocationLimits;
pub use self::logging::{LogFormat, LogFormatParseError};

/// Host-wide configuration shared by the engine and the CLI.
///
/// # Example
///
/// ```rust,ignore
/// use plinth_config::Config;
///
/// let config = Config::default();
/// assert!(config.mask_internal_errors());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    plugin_root: PathBuf,
    registry_path: PathBuf,
    max_package_bytes: u64,
    limits: InvocationLimits,
    log_filter: String,
    log_format: LogFormat,
    mask_internal_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_root = defaults::default_data_root();
        Self {
            plugin_root: data_root.join("plugins"),
            registry_path: data_root.join("registry.json"),
            max_package_bytes: defaults::DEFAULT_MAX_PACKAGE_BYTES,
            limits: InvocationLimits::default(),
            log_filter: defaults::default_log_filter_string(),
            log_format: LogFormat::default(),
            mask_internal_errors: true,
        }
    }
}

impl Config {
    /// Directory under which one sub-directory per installed plugin lives.
    #[must_use]
    pub fn plugin_root(&self) -> &Path {
        self.plugin_root.as_path()
    }

    /// Path of the persisted registry snapshot.
    #[must_use]
    pub fn registry_path(&self) -> &Path {
        self.registry_path.as_path()
    }

    /// Upper bound on the size of an uploaded package archive in bytes.
    #[must_use]
    pub const fn max_package_bytes(&self) -> u64 {
        self.max_package_bytes
    }

    /// Per-invocation resource ceilings.
    #[must_use]
    pub const fn limits(&self) -> &InvocationLimits {
        &self.limits
    }

    /// Wall-clock budget granted to a single plugin invocation.
    #[must_use]
    pub const fn invocation_budget(&self) -> Duration {
        self.limits.budget()
    }

    /// Log filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected logging output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether internal faults are reported to callers as a generic message.
    #[must_use]
    pub const fn mask_internal_errors(&self) -> bool {
        self.mask_internal_errors
    }

    /// Replaces the plugin root directory.
    #[must_use]
    pub fn with_plugin_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.plugin_root = root.into();
        self
    }

    /// Replaces the registry snapshot path.
    #[must_use]
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Overrides the package size ceiling.
    #[must_use]
    pub const fn with_max_package_bytes(mut self, bytes: u64) -> Self {
        self.max_package_bytes = bytes;
        self
    }

    /// Overrides the per-invocation resource ceilings.
    #[must_use]
    pub const fn with_limits(mut self, limits: InvocationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Overrides the log filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Overrides the logging output format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Controls whether internal faults are masked toward callers.
    #[must_use]
    pub const fn with_mask_internal_errors(mut self, mask: bool) -> Self {
        self.mask_internal_errors = mask;
        self
    }
}
