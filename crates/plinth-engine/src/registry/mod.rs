//! Registry records and the storage adapter contract.
//!
//! The engine never owns plugin metadata; it reads [`PluginRecord`]s through
//! the narrow [`RegistryAdapter`] trait. Two implementations ship with the
//! crate: an in-memory store for tests and embedding, and a JSON snapshot
//! store that persists every mutation atomically via a temp-file rename.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::manifest::{EntryPoint, PluginManifest};

/// Metadata describing one installed plugin, owned by the registry.
///
/// Records are created by the installer, mutated only through
/// [`RegistryAdapter::set_enabled`], and destroyed by an explicit delete.
/// Field names serialise in camelCase to match the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    entry_point: String,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl PluginRecord {
    /// Creates an enabled record from a validated manifest.
    #[must_use]
    pub fn new(id: impl Into<String>, manifest: &PluginManifest) -> Self {
        Self {
            id: id.into(),
            name: manifest.name().to_owned(),
            description: manifest.description().map(str::to_owned),
            author: manifest.author().map(str::to_owned),
            version: manifest.version().map(str::to_owned),
            entry_point: manifest.entry_point().to_owned(),
            enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Returns the stable plugin identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the globally unique plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the display description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the author, if any.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Returns the version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the raw `module.function` entry point string.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        self.entry_point.as_str()
    }

    /// Parses the record's entry point.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EntryPoint`] when the stored value is not of
    /// the form `module.function`.
    pub fn entry(&self) -> Result<EntryPoint, PluginError> {
        EntryPoint::parse(&self.entry_point)
    }

    /// Returns whether runs of this plugin are permitted.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the listing projection of this record.
    #[must_use]
    pub fn summary(&self) -> PluginSummary {
        PluginSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Listing projection of a record: identifier plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSummary {
    /// Stable plugin identifier.
    pub id: String,
    /// Plugin name.
    pub name: String,
    /// Display description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The narrow storage contract the engine needs from metadata persistence.
///
/// Implementations must be safe for concurrent reads; the engine itself is
/// read-mostly and performs no caching on top of the adapter.
pub trait RegistryAdapter: Send + Sync {
    /// Looks up a record by plugin identifier.
    ///
    /// # Errors
    ///
    /// Returns a `System`-kind error when the underlying storage fails.
    fn get(&self, id: &str) -> Result<Option<PluginRecord>, PluginError>;

    /// Returns whether any record uses the given name.
    ///
    /// # Errors
    ///
    /// Returns a `System`-kind error when the underlying storage fails.
    fn contains_name(&self, name: &str) -> Result<bool, PluginError>;

    /// Returns all records, newest first.
    ///
    /// # Errors
    ///
    /// Returns a `System`-kind error when the underlying storage fails.
    fn list(&self) -> Result<Vec<PluginRecord>, PluginError>;

    /// Commits a new record.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::DuplicateName`] when the name is taken and a
    /// `System`-kind error when the underlying storage fails.
    fn insert(&self, record: PluginRecord) -> Result<(), PluginError>;

    /// Flips the enablement flag, returning the value it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown identifier.
    fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, PluginError>;

    /// Removes and returns a record.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown identifier.
    fn remove(&self, id: &str) -> Result<PluginRecord, PluginError>;
}

fn lock_poisoned() -> PluginError {
    PluginError::Registry {
        message: String::from("registry lock poisoned"),
    }
}

fn insert_record(
    records: &mut HashMap<String, PluginRecord>,
    record: PluginRecord,
) -> Result<(), PluginError> {
    if records.values().any(|r| r.name() == record.name()) {
        return Err(PluginError::DuplicateName {
            name: record.name().to_owned(),
        });
    }
    if records.contains_key(record.id()) {
        return Err(PluginError::Registry {
            message: format!("identifier '{}' is already in use", record.id()),
        });
    }
    records.insert(record.id().to_owned(), record);
    Ok(())
}

fn sorted_newest_first(records: &HashMap<String, PluginRecord>) -> Vec<PluginRecord> {
    let mut list: Vec<PluginRecord> = records.values().cloned().collect();
    list.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| a.name().cmp(b.name())));
    list
}

/// Registry adapter holding records in process memory.
///
/// # Example
///
/// ```
/// use plinth_engine::manifest::PluginManifest;
/// use plinth_engine::registry::{InMemoryRegistry, PluginRecord, RegistryAdapter};
///
/// let registry = InMemoryRegistry::new();
/// let record = PluginRecord::new("id-1", &PluginManifest::new("resize"));
/// registry.insert(record).expect("insert succeeds");
/// assert!(registry.get("id-1").expect("lookup").is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    records: RwLock<HashMap<String, PluginRecord>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryAdapter for InMemoryRegistry {
    fn get(&self, id: &str) -> Result<Option<PluginRecord>, PluginError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        Ok(records.get(id).cloned())
    }

    fn contains_name(&self, name: &str) -> Result<bool, PluginError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        Ok(records.values().any(|r| r.name() == name))
    }

    fn list(&self) -> Result<Vec<PluginRecord>, PluginError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        Ok(sorted_newest_first(&records))
    }

    fn insert(&self, record: PluginRecord) -> Result<(), PluginError> {
        let mut records = self.records.write().map_err(|_| lock_poisoned())?;
        insert_record(&mut records, record)
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, PluginError> {
        let mut records = self.records.write().map_err(|_| lock_poisoned())?;
        let record = records.get_mut(id).ok_or_else(|| PluginError::NotFound {
            id: id.to_owned(),
        })?;
        let previous = record.enabled();
        record.set_enabled(enabled);
        Ok(previous)
    }

    fn remove(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let mut records = self.records.write().map_err(|_| lock_poisoned())?;
        records.remove(id).ok_or_else(|| PluginError::NotFound {
            id: id.to_owned(),
        })
    }
}

/// Registry adapter persisting every mutation to a JSON snapshot file.
///
/// Mutations are applied to a copy, written to a sibling temp file, and
/// renamed over the snapshot, so a crash mid-write never corrupts the store
/// and readers always observe a complete snapshot.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
    records: RwLock<HashMap<String, PluginRecord>>,
}

impl JsonFileRegistry {
    /// Opens the registry at `path`, loading the snapshot when present.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the snapshot exists but cannot be read, or
    /// a `Registry` error when it cannot be parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PluginError> {
        let path = path.into();
        let records = if path.exists() {
            let bytes = fs::read(&path).map_err(|err| PluginError::io(&path, err))?;
            let list: Vec<PluginRecord> =
                serde_json::from_slice(&bytes).map_err(|err| PluginError::Registry {
                    message: format!("corrupt registry snapshot at '{}': {err}", path.display()),
                })?;
            list.into_iter().map(|r| (r.id().to_owned(), r)).collect()
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn persist(&self, records: &HashMap<String, PluginRecord>) -> Result<(), PluginError> {
        let list = sorted_newest_first(records);
        let bytes = serde_json::to_vec_pretty(&list).map_err(|err| PluginError::Registry {
            message: format!("failed to serialise registry snapshot: {err}"),
        })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| PluginError::io(parent, err))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).map_err(|err| PluginError::io(&tmp, err))?;
        fs::rename(&tmp, &self.path).map_err(|err| PluginError::io(&self.path, err))
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut HashMap<String, PluginRecord>) -> Result<T, PluginError>,
    ) -> Result<T, PluginError> {
        let mut records = self.records.write().map_err(|_| lock_poisoned())?;
        let mut next = records.clone();
        let out = apply(&mut next)?;
        self.persist(&next)?;
        *records = next;
        Ok(out)
    }
}

impl RegistryAdapter for JsonFileRegistry {
    fn get(&self, id: &str) -> Result<Option<PluginRecord>, PluginError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        Ok(records.get(id).cloned())
    }

    fn contains_name(&self, name: &str) -> Result<bool, PluginError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        Ok(records.values().any(|r| r.name() == name))
    }

    fn list(&self) -> Result<Vec<PluginRecord>, PluginError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        Ok(sorted_newest_first(&records))
    }

    fn insert(&self, record: PluginRecord) -> Result<(), PluginError> {
        self.mutate(|records| insert_record(records, record))
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, PluginError> {
        self.mutate(|records| {
            let record = records.get_mut(id).ok_or_else(|| PluginError::NotFound {
                id: id.to_owned(),
            })?;
            let previous = record.enabled();
            record.set_enabled(enabled);
            Ok(previous)
        })
    }

    fn remove(&self, id: &str) -> Result<PluginRecord, PluginError> {
        self.mutate(|records| {
            records.remove(id).ok_or_else(|| PluginError::NotFound {
                id: id.to_owned(),
            })
        })
    }
}
