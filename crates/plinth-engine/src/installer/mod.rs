//! Package installation, deletion, and on-disk layout.
//!
//! The installer turns an uploaded zip archive into a package directory plus
//! a committed registry record, all-or-nothing: any validation failure after
//! extraction removes the directory and leaves the registry untouched.
//! Deletion removes both artifacts together and stays retryable after a
//! partial failure, keeping the package/record lockstep invariant.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;
use zip::ZipArchive;

use crate::error::PluginError;
use crate::manifest::{EntryPoint, METADATA_FILE, PluginManifest};
use crate::registry::{PluginRecord, RegistryAdapter};

/// Tracing target for installer operations.
const INSTALLER_TARGET: &str = "plinth_engine::installer";

/// On-disk layout of installed packages under one root directory.
///
/// Each plugin occupies `<root>/<id>/` holding `plugin.json` and its code
/// files. A package directory exists if and only if a registry record does.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Creates a store rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory holding all packages.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Returns the package directory for a plugin identifier.
    #[must_use]
    pub fn package_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Returns the metadata file path for a plugin identifier.
    #[must_use]
    pub fn metadata_path(&self, id: &str) -> PathBuf {
        self.package_dir(id).join(METADATA_FILE)
    }

    /// Returns the code file path for an entry point's module.
    #[must_use]
    pub fn module_path(&self, id: &str, entry: &EntryPoint) -> PathBuf {
        self.package_dir(id).join(entry.module_file())
    }
}

/// Validates, extracts, and registers uploaded plugin packages.
pub struct PackageInstaller {
    store: PackageStore,
    registry: Arc<dyn RegistryAdapter>,
    max_package_bytes: u64,
}

impl PackageInstaller {
    /// Creates an installer writing packages into `store` and records into
    /// `registry`, rejecting archives larger than `max_package_bytes`.
    #[must_use]
    pub fn new(
        store: PackageStore,
        registry: Arc<dyn RegistryAdapter>,
        max_package_bytes: u64,
    ) -> Self {
        Self {
            store,
            registry,
            max_package_bytes,
        }
    }

    /// Returns the package layout used by this installer.
    #[must_use]
    pub const fn store(&self) -> &PackageStore {
        &self.store
    }

    /// Installs a plugin from raw zip archive bytes.
    ///
    /// Generates a fresh identifier, extracts the archive into the package
    /// directory, validates `plugin.json`, enforces name uniqueness, and
    /// commits the record. On success the package and record both exist; on
    /// any failure, neither does.
    ///
    /// # Errors
    ///
    /// Returns a validation error for oversized, malformed, or escaping
    /// archives and for bad metadata; [`PluginError::DuplicateName`] when
    /// the name is taken; and a `System`-kind error for storage faults.
    pub fn install(&self, archive: &[u8]) -> Result<PluginRecord, PluginError> {
        if archive.len() as u64 > self.max_package_bytes {
            return Err(PluginError::validation(format!(
                "package of {} bytes exceeds the {} byte limit",
                archive.len(),
                self.max_package_bytes
            )));
        }

        let id = Uuid::new_v4().to_string();
        let dir = self.store.package_dir(&id);
        fs::create_dir_all(&dir).map_err(|err| PluginError::io(&dir, err))?;

        match self.populate(&id, &dir, archive) {
            Ok(record) => {
                debug!(
                    target: INSTALLER_TARGET,
                    plugin = record.name(),
                    id = record.id(),
                    "installed plugin package"
                );
                Ok(record)
            }
            Err(err) => {
                // All-or-nothing: the record was never committed (or the
                // registry insert itself failed), so the directory goes too.
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!(
                        target: INSTALLER_TARGET,
                        id,
                        error = %cleanup,
                        "failed to clean up package directory after aborted install"
                    );
                }
                Err(err)
            }
        }
    }

    fn populate(&self, id: &str, dir: &Path, archive: &[u8]) -> Result<PluginRecord, PluginError> {
        extract_archive(dir, archive)?;

        let metadata_path = dir.join(METADATA_FILE);
        let bytes = fs::read(&metadata_path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                PluginError::validation(format!("package is missing {METADATA_FILE} at its root"))
            } else {
                PluginError::io(&metadata_path, err)
            }
        })?;
        let manifest = PluginManifest::from_json(&bytes)?;

        if self.registry.contains_name(manifest.name())? {
            return Err(PluginError::DuplicateName {
                name: manifest.name().to_owned(),
            });
        }

        let record = PluginRecord::new(id, &manifest);
        self.registry.insert(record.clone())?;
        Ok(record)
    }

    /// Deletes a plugin's package directory and registry record together.
    ///
    /// The directory is removed before the record so a failure leaves the
    /// record in place and the operation retryable; a retry tolerates an
    /// already-missing directory and still removes the record.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown identifier and a
    /// `System`-kind error when either artifact cannot be removed.
    pub fn delete(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let record = self
            .registry
            .get(id)?
            .ok_or_else(|| PluginError::NotFound { id: id.to_owned() })?;

        let dir = self.store.package_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|err| PluginError::io(&dir, err))?;
        }
        let removed = self.registry.remove(id)?;
        debug!(
            target: INSTALLER_TARGET,
            plugin = record.name(),
            id,
            "deleted plugin package and record"
        );
        Ok(removed)
    }

    /// Reads and parses the installed package's metadata file.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when no record exists or the
    /// metadata file has vanished from disk, a validation error when the
    /// stored metadata no longer parses, and a `System`-kind error when the
    /// file cannot be read.
    pub fn read_manifest(&self, id: &str) -> Result<PluginManifest, PluginError> {
        if self.registry.get(id)?.is_none() {
            return Err(PluginError::NotFound { id: id.to_owned() });
        }
        let path = self.store.metadata_path(id);
        let bytes = fs::read(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                PluginError::NotFound { id: id.to_owned() }
            } else {
                PluginError::io(&path, err)
            }
        })?;
        PluginManifest::from_json(&bytes)
    }
}

/// Extracts a zip archive into `dir`, rejecting entries that escape it.
fn extract_archive(dir: &Path, archive: &[u8]) -> Result<(), PluginError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|err| PluginError::validation(format!("not a valid zip archive: {err}")))?;
    if zip.len() == 0 {
        return Err(PluginError::validation("package archive is empty"));
    }

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| PluginError::validation(format!("corrupt archive entry: {err}")))?;

        // Path-traversal guard: any entry that would resolve outside the
        // package directory is fatal for the whole install.
        let relative = entry.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            PluginError::validation(format!(
                "archive entry '{}' escapes the package directory",
                entry.name()
            ))
        })?;
        let target = dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|err| PluginError::io(&target, err))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| PluginError::io(parent, err))?;
        }
        let mut out = fs::File::create(&target).map_err(|err| PluginError::io(&target, err))?;
        io::copy(&mut entry, &mut out).map_err(|err| PluginError::io(&target, err))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
