//! Default values shared by the engine and the binaries.

use std::env;
use std::path::PathBuf;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default ceiling on uploaded package archives (10 MiB).
pub const DEFAULT_MAX_PACKAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Default wall-clock budget for one plugin invocation, in milliseconds.
pub const DEFAULT_INVOCATION_BUDGET_MS: u64 = 30_000;

/// Default memory ceiling for one plugin invocation (64 MiB).
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Computes the base directory for host-owned data.
///
/// Prefers the platform data directory and falls back to a namespaced
/// directory under the system temp directory when none is available.
#[must_use]
pub fn default_data_root() -> PathBuf {
    dirs::data_local_dir().map_or_else(|| env::temp_dir().join("plinth"), |dir| dir.join("plinth"))
}
