//! Top-level facade wiring configuration, storage, and execution together.
//!
//! [`PluginHost`] owns the persistent registry, the package installer, and
//! the Lua-backed engine, exposing the full plugin lifecycle behind one
//! handle: install, list, inspect, toggle, delete, run.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use plinth_config::Config;

use crate::engine::PluginEngine;
use crate::envelope::Envelope;
use crate::error::PluginError;
use crate::installer::{PackageInstaller, PackageStore};
use crate::manifest::PluginMetadata;
use crate::registry::{JsonFileRegistry, PluginRecord, PluginSummary, RegistryAdapter};
use crate::runtime::LuaExecutor;

/// Tracing target for lifecycle operations.
const HOST_TARGET: &str = "plinth_engine::host";

/// Self-contained plugin host over a persistent registry and package root.
pub struct PluginHost {
    registry: Arc<dyn RegistryAdapter>,
    installer: PackageInstaller,
    engine: PluginEngine<LuaExecutor>,
}

impl PluginHost {
    /// Opens a host with the persistent JSON registry named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the plugin root cannot be created or the
    /// registry snapshot cannot be read.
    pub fn open(config: &Config) -> Result<Self, PluginError> {
        std::fs::create_dir_all(config.plugin_root())
            .map_err(|err| PluginError::io(config.plugin_root(), err))?;
        let registry: Arc<dyn RegistryAdapter> =
            Arc::new(JsonFileRegistry::open(config.registry_path())?);
        Ok(Self::with_registry(config, registry))
    }

    /// Builds a host over an existing registry adapter.
    ///
    /// Used by tests to run against an in-memory registry; [`Self::open`]
    /// is the production entry point.
    #[must_use]
    pub fn with_registry(config: &Config, registry: Arc<dyn RegistryAdapter>) -> Self {
        let store = PackageStore::new(config.plugin_root());
        let installer = PackageInstaller::new(
            store.clone(),
            Arc::clone(&registry),
            config.max_package_bytes(),
        );
        let engine = PluginEngine::new(
            Arc::clone(&registry),
            store,
            LuaExecutor::new(*config.limits()),
            config.mask_internal_errors(),
        );
        Self {
            registry,
            installer,
            engine,
        }
    }

    /// Installs a plugin package from raw zip bytes and returns its record.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed archives or metadata,
    /// [`PluginError::DuplicateName`] for a name collision, and I/O errors
    /// from extraction.
    pub fn install_package(&self, archive: &[u8]) -> Result<PluginRecord, PluginError> {
        let record = self.installer.install(archive)?;
        info!(
            target: HOST_TARGET,
            plugin = record.name(),
            plugin_id = record.id(),
            "installed plugin"
        );
        Ok(record)
    }

    /// Lists all registered plugins, newest first.
    ///
    /// Returns the listing projection only; full records, including the
    /// entry point and enablement flag, stay behind [`Self::install_package`]
    /// and [`Self::delete_plugin`].
    ///
    /// # Errors
    ///
    /// Returns a registry error when the record set cannot be read.
    pub fn list_plugins(&self) -> Result<Vec<PluginSummary>, PluginError> {
        Ok(self
            .registry
            .list()?
            .iter()
            .map(PluginRecord::summary)
            .collect())
    }

    /// Reads the caller-facing metadata of an installed plugin.
    ///
    /// Reads through to the stored `plugin.json` so schema fields the
    /// registry does not track, such as `ui_schema`, are returned verbatim;
    /// the entry point is not part of the projection.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown identifier or a
    /// missing metadata file, and a validation error when the stored
    /// metadata no longer parses.
    pub fn metadata(&self, id: &str) -> Result<PluginMetadata, PluginError> {
        Ok(self.installer.read_manifest(id)?.metadata())
    }

    /// Enables or disables a plugin, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown identifier.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, PluginError> {
        let previous = self.registry.set_enabled(id, enabled)?;
        if previous != enabled {
            info!(target: HOST_TARGET, plugin_id = id, enabled, "toggled plugin");
        }
        Ok(enabled)
    }

    /// Removes a plugin's package directory and registry record.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown identifier and I/O
    /// errors when the package directory cannot be removed; in the latter
    /// case the record is kept so the delete can be retried.
    pub fn delete_plugin(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let record = self.installer.delete(id)?;
        info!(
            target: HOST_TARGET,
            plugin = record.name(),
            plugin_id = id,
            "deleted plugin"
        );
        Ok(record)
    }

    /// Runs a plugin with the given input mapping.
    ///
    /// Never fails: every error is folded into a fault envelope.
    #[must_use]
    pub fn run_plugin(&self, id: &str, input: &Map<String, Value>) -> Envelope {
        self.engine.run(id, input)
    }
}
