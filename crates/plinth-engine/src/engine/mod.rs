//! Run orchestration: registry resolution, enablement, and invocation.
//!
//! [`PluginEngine`] is the public API collaborators call to execute a plugin.
//! It resolves the record through the [`RegistryAdapter`], enforces the
//! enablement flag before any code is touched, parses the entry point,
//! locates the module's code file, and delegates to a [`PluginExecutor`].
//!
//! The executor abstraction enables test doubles that count or stub
//! invocations without running a real scripting runtime.
//!
//! Per invocation the engine moves through resolving, loading, invoking,
//! and normalising; nothing is retained between runs, so every call starts
//! from resolution again.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::envelope::{Envelope, RawOutcome};
use crate::error::{ErrorKind, PluginError};
use crate::installer::PackageStore;
use crate::manifest::EntryPoint;
use crate::registry::RegistryAdapter;

/// Tracing target for engine operations.
const ENGINE_TARGET: &str = "plinth_engine::engine";

/// Everything an executor needs to run one entry point once.
///
/// Borrowed for the duration of a single call; the input mapping is owned by
/// the caller and read-only to the executor and to plugin code.
#[derive(Debug)]
pub struct Invocation<'a> {
    plugin: &'a str,
    id: &'a str,
    module_path: &'a Path,
    entry: &'a EntryPoint,
    input: &'a Map<String, Value>,
}

impl<'a> Invocation<'a> {
    /// Bundles the resolved pieces of one run request.
    #[must_use]
    pub const fn new(
        plugin: &'a str,
        id: &'a str,
        module_path: &'a Path,
        entry: &'a EntryPoint,
        input: &'a Map<String, Value>,
    ) -> Self {
        Self {
            plugin,
            id,
            module_path,
            entry,
            input,
        }
    }

    /// Returns the plugin name, for error context.
    #[must_use]
    pub const fn plugin(&self) -> &str {
        self.plugin
    }

    /// Returns the plugin identifier.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id
    }

    /// Returns the resolved path of the entry module's code file.
    #[must_use]
    pub const fn module_path(&self) -> &Path {
        self.module_path
    }

    /// Returns the parsed entry point.
    #[must_use]
    pub const fn entry(&self) -> &EntryPoint {
        self.entry
    }

    /// Returns the caller-supplied input mapping.
    #[must_use]
    pub const fn input(&self) -> &Map<String, Value> {
        self.input
    }
}

/// Trait abstracting plugin code execution for testability.
///
/// The production implementation is
/// [`LuaExecutor`](crate::runtime::LuaExecutor), which builds a fresh Lua
/// state per call. Test code can implement this trait to observe or stub
/// invocations.
pub trait PluginExecutor {
    /// Loads and runs the invocation's entry point, returning the decoded
    /// raw return value.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the code fails to load, the entry
    /// function is missing, the invocation faults, or it exceeds its budget.
    fn invoke(&self, invocation: &Invocation<'_>) -> Result<Value, PluginError>;
}

/// Orchestrates plugin runs by resolving records and delegating to an
/// executor.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use plinth_engine::engine::{Invocation, PluginEngine, PluginExecutor};
/// use plinth_engine::error::PluginError;
/// use plinth_engine::installer::PackageStore;
/// use plinth_engine::registry::InMemoryRegistry;
/// use serde_json::{Map, Value, json};
///
/// struct StubExecutor;
///
/// impl PluginExecutor for StubExecutor {
///     fn invoke(&self, _invocation: &Invocation<'_>) -> Result<Value, PluginError> {
///         Ok(json!({"status": "success"}))
///     }
/// }
///
/// let registry = Arc::new(InMemoryRegistry::new());
/// let engine = PluginEngine::new(registry, PackageStore::new("/tmp/plugins"), StubExecutor, true);
/// let envelope = engine.run("unknown", &Map::new());
/// assert!(envelope.is_error());
/// ```
pub struct PluginEngine<E> {
    registry: Arc<dyn RegistryAdapter>,
    store: PackageStore,
    executor: E,
    mask_internal_errors: bool,
}

impl<E> PluginEngine<E> {
    /// Creates an engine reading records from `registry` and packages from
    /// `store`, delegating execution to `executor`.
    #[must_use]
    pub fn new(
        registry: Arc<dyn RegistryAdapter>,
        store: PackageStore,
        executor: E,
        mask_internal_errors: bool,
    ) -> Self {
        Self {
            registry,
            store,
            executor,
            mask_internal_errors,
        }
    }

    /// Returns the package layout the engine resolves code files against.
    #[must_use]
    pub const fn store(&self) -> &PackageStore {
        &self.store
    }
}

impl<E: PluginExecutor> PluginEngine<E> {
    /// Runs a plugin and always returns an envelope.
    ///
    /// Every failure is converted into a fault envelope; the engine never
    /// raises across this boundary. `System`-kind faults are logged with
    /// full detail server-side and masked toward the caller when the engine
    /// was configured to do so.
    pub fn run(&self, id: &str, input: &Map<String, Value>) -> Envelope {
        match self.try_run(id, input) {
            Ok(envelope) => envelope,
            Err(err) => {
                if err.kind() == ErrorKind::System {
                    error!(target: ENGINE_TARGET, plugin_id = id, error = %err, "internal fault during plugin run");
                } else {
                    debug!(target: ENGINE_TARGET, plugin_id = id, kind = %err.kind(), error = %err, "plugin run failed");
                }
                Envelope::from_error(&err, self.mask_internal_errors)
            }
        }
    }

    /// Runs a plugin, surfacing failures as typed errors.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown identifier,
    /// [`PluginError::Disabled`] before any code is loaded when the record
    /// is disabled, [`PluginError::EntryPoint`] for a malformed entry point,
    /// [`PluginError::MissingModule`] when the code file is absent, and any
    /// error produced by the executor.
    pub fn try_run(
        &self,
        id: &str,
        input: &Map<String, Value>,
    ) -> Result<Envelope, PluginError> {
        let record = self
            .registry
            .get(id)?
            .ok_or_else(|| PluginError::NotFound { id: id.to_owned() })?;

        if !record.enabled() {
            return Err(PluginError::Disabled {
                name: record.name().to_owned(),
            });
        }

        let entry = record.entry()?;
        let module_path = self.store.module_path(id, &entry);
        if !module_path.is_file() {
            return Err(PluginError::MissingModule {
                plugin: record.name().to_owned(),
                module: entry.module().to_owned(),
            });
        }

        debug!(
            target: ENGINE_TARGET,
            plugin = record.name(),
            entry = %entry,
            phase = "loading",
            "invoking plugin entry point"
        );
        let invocation = Invocation::new(record.name(), id, &module_path, &entry, input);
        let value = self.executor.invoke(&invocation)?;

        debug!(
            target: ENGINE_TARGET,
            plugin = record.name(),
            phase = "normalising",
            "plugin returned, normalising result"
        );
        Ok(Envelope::normalise(RawOutcome::from_value(value)))
    }
}
