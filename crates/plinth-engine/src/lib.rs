//! Plugin lifecycle and execution engine.
//!
//! The engine accepts plugin packages as zip archives, validates and
//! extracts them into a per-plugin package directory, records them in a
//! persistent registry, and runs their Lua entry points on demand. Every
//! invocation builds a fresh, resource-limited interpreter so plugins can
//! never observe each other's state or a previous run of their own.
//!
//! The crate is layered bottom-up:
//!
//! - [`manifest`] parses and validates `plugin.json` metadata and entry
//!   points of the form `module.function`.
//! - [`registry`] persists plugin records behind the [`registry::RegistryAdapter`]
//!   trait, with in-memory and JSON-file implementations.
//! - [`installer`] turns uploaded archives into committed package
//!   directories and records, atomically.
//! - [`engine`] resolves a run request through the registry and delegates
//!   to a [`engine::PluginExecutor`].
//! - [`runtime`] is the production executor: one Lua state per invocation,
//!   bounded by a wall-clock budget and a memory ceiling.
//! - [`envelope`] normalises whatever a plugin returns into the wire-level
//!   result shape.
//! - [`host`] wires the layers together behind a single [`host::PluginHost`]
//!   facade.

pub mod engine;
pub mod envelope;
pub mod error;
pub mod host;
pub mod installer;
pub mod manifest;
pub mod registry;
pub mod runtime;

pub use engine::{Invocation, PluginEngine, PluginExecutor};
pub use envelope::{Envelope, RawOutcome};
pub use error::{ErrorKind, PluginError};
pub use host::PluginHost;
pub use installer::{PackageInstaller, PackageStore};
pub use manifest::{EntryPoint, PluginManifest, PluginMetadata};
pub use registry::{
    InMemoryRegistry, JsonFileRegistry, PluginRecord, PluginSummary, RegistryAdapter,
};
pub use runtime::LuaExecutor;

#[cfg(test)]
mod tests;
