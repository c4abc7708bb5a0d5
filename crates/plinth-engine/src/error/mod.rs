//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint. The coarse [`ErrorKind`]
//! classification drives envelope conversion and caller-facing masking.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin installation, lookup, and execution.
#[derive(Debug, Error)]
pub enum PluginError {
    /// An uploaded package or its metadata failed validation.
    #[error("invalid package: {message}")]
    Validation {
        /// Human-readable description of the defect.
        message: String,
    },

    /// Another installed plugin already uses the requested name.
    #[error("a plugin named '{name}' is already installed")]
    DuplicateName {
        /// Name that collided.
        name: String,
    },

    /// The declared entry point is not of the form `module.function`.
    #[error("invalid entry point '{entry_point}': expected 'module.function'")]
    EntryPoint {
        /// The offending entry point value.
        entry_point: String,
    },

    /// No plugin with the given identifier exists in the registry.
    #[error("plugin '{id}' not found")]
    NotFound {
        /// Identifier that was looked up.
        id: String,
    },

    /// The entry module's code file is missing from the package.
    #[error("plugin '{plugin}' has no entry module file '{module}.lua'")]
    MissingModule {
        /// Plugin name.
        plugin: String,
        /// Module named by the entry point.
        module: String,
    },

    /// The entry function is absent from the loaded module.
    #[error("plugin '{plugin}' module '{module}' does not define function '{function}'")]
    MissingFunction {
        /// Plugin name.
        plugin: String,
        /// Module named by the entry point.
        module: String,
        /// Function named by the entry point.
        function: String,
    },

    /// The plugin exists but is disabled; no code was loaded.
    #[error("plugin '{name}' is disabled")]
    Disabled {
        /// Plugin name.
        name: String,
    },

    /// The plugin code failed to load into its execution context.
    #[error("plugin '{plugin}' failed to load: {message}")]
    Load {
        /// Plugin name.
        plugin: String,
        /// Underlying load or parse failure.
        message: String,
    },

    /// The plugin raised a fault while its entry function ran.
    #[error("plugin '{plugin}' raised during invocation: {message}")]
    Execution {
        /// Plugin name.
        plugin: String,
        /// Underlying fault message.
        message: String,
        /// Diagnostic stack traceback, when the runtime produced one.
        trace: Option<String>,
    },

    /// The invocation exceeded its wall-clock budget and was aborted.
    #[error("plugin '{plugin}' exceeded its invocation budget of {budget_ms}ms")]
    Timeout {
        /// Plugin name.
        plugin: String,
        /// Configured budget in milliseconds.
        budget_ms: u64,
    },

    /// An I/O fault occurred while touching a package or the registry store.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The registry storage misbehaved in an unexpected way.
    #[error("registry error: {message}")]
    Registry {
        /// Description of the storage fault.
        message: String,
    },

    /// The host itself failed while preparing an execution context.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal fault.
        message: String,
    },
}

impl PluginError {
    /// Builds a validation error from any displayable message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::DuplicateName { .. } | Self::EntryPoint { .. } => {
                ErrorKind::Validation
            }
            Self::NotFound { .. } | Self::MissingModule { .. } | Self::MissingFunction { .. } => {
                ErrorKind::NotFound
            }
            Self::Disabled { .. } => ErrorKind::Disabled,
            Self::Load { .. } => ErrorKind::Load,
            Self::Execution { .. } | Self::Timeout { .. } => ErrorKind::Execution,
            Self::Io { .. } | Self::Registry { .. } | Self::Internal { .. } => ErrorKind::System,
        }
    }
}

/// Coarse error classification mirroring the host's reporting policy.
///
/// Every [`PluginError`] maps onto exactly one kind. `System` errors are the
/// only class whose detail is withheld from callers when masking is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed package, metadata, or entry point configuration.
    Validation,
    /// Unknown plugin identifier or missing entry module/function.
    NotFound,
    /// The plugin is installed but disabled.
    Disabled,
    /// Plugin code failed to load into its execution context.
    Load,
    /// Plugin code raised, or ran past its budget, during invocation.
    Execution,
    /// Unexpected internal fault; detail stays server-side.
    System,
}

impl ErrorKind {
    /// Returns the canonical lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Disabled => "disabled",
            Self::Load => "load",
            Self::Execution => "execution",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests;
