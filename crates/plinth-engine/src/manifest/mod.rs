//! Plugin metadata file types.
//!
//! Every package carries a `plugin.json` at its root declaring the plugin's
//! identity and entry point. The manifest is parsed with serde and then
//! validated so obviously broken packages are rejected before anything is
//! committed to the registry. The `ui_schema` field is opaque to the engine
//! and passed through verbatim to front-end collaborators.

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// File name of the metadata file at the package root.
pub const METADATA_FILE: &str = "plugin.json";

/// Entry point assumed when the manifest does not declare one.
pub const DEFAULT_ENTRY_POINT: &str = "main.run";

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_owned()
}

/// Declarative description of a plugin shipped inside its package.
///
/// # Example
///
/// ```
/// use plinth_engine::manifest::PluginManifest;
///
/// let manifest = PluginManifest::from_json(
///     br#"{"name": "resize", "version": "1.2.0"}"#,
/// ).expect("valid manifest");
/// assert_eq!(manifest.name(), "resize");
/// assert_eq!(manifest.entry_point(), "main.run");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default = "default_entry_point")]
    entry_point: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    ui_schema: Vec<serde_json::Value>,
}

impl PluginManifest {
    /// Creates a manifest with defaults for all optional fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            author: None,
            version: None,
            entry_point: default_entry_point(),
            ui_schema: Vec::new(),
        }
    }

    /// Parses a manifest from raw `plugin.json` bytes and validates it.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the JSON is malformed, the required
    /// `name` field is missing or empty, or the entry point is not of the
    /// form `module.function`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, PluginError> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|err| PluginError::validation(format!("malformed {METADATA_FILE}: {err}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validates the manifest contents.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Validation`] when the name is empty and
    /// [`PluginError::EntryPoint`] when the entry point cannot be parsed.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::validation(format!(
                "{METADATA_FILE} is missing the required field: name"
            )));
        }
        EntryPoint::parse(&self.entry_point)?;
        Ok(())
    }

    /// Overrides the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overrides the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Overrides the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Overrides the entry point.
    #[must_use]
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Replaces the opaque UI schema descriptors.
    #[must_use]
    pub fn with_ui_schema(mut self, ui_schema: Vec<serde_json::Value>) -> Self {
        self.ui_schema = ui_schema;
        self
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the display description, if declared.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the author, if declared.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Returns the version, if declared.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the raw `module.function` entry point string.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        self.entry_point.as_str()
    }

    /// Returns the opaque UI field descriptors.
    #[must_use]
    pub fn ui_schema(&self) -> &[serde_json::Value] {
        &self.ui_schema
    }

    /// Projects the manifest into its caller-facing metadata shape.
    #[must_use]
    pub fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            author: self.author.clone(),
            ui_schema: self.ui_schema.clone(),
        }
    }
}

/// Caller-facing projection of a manifest.
///
/// The entry point is deliberately absent: it names a code file inside the
/// package and is only of interest to the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    /// Plugin name.
    pub name: String,
    /// Display description, if declared.
    pub description: Option<String>,
    /// Version string, if declared.
    pub version: Option<String>,
    /// Author, if declared.
    pub author: Option<String>,
    /// Opaque UI field descriptors, passed through verbatim.
    pub ui_schema: Vec<serde_json::Value>,
}

/// A parsed `module.function` entry point reference.
///
/// The module half names a code file inside the package directory, so it is
/// restricted to a single path component: separators and parent references
/// are rejected at parse time.
///
/// # Example
///
/// ```
/// use plinth_engine::manifest::EntryPoint;
///
/// let entry = EntryPoint::parse("main.run").expect("valid entry point");
/// assert_eq!(entry.module(), "main");
/// assert_eq!(entry.function(), "run");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    module: String,
    function: String,
}

impl EntryPoint {
    /// Parses an entry point of the form `module.function`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EntryPoint`] when the separator is missing,
    /// either half is empty, or the module half is not a bare file stem.
    pub fn parse(entry_point: &str) -> Result<Self, PluginError> {
        let invalid = || PluginError::EntryPoint {
            entry_point: entry_point.to_owned(),
        };
        let (module, function) = entry_point.split_once('.').ok_or_else(invalid)?;
        if module.is_empty() || function.is_empty() {
            return Err(invalid());
        }
        // The module names a file inside the package directory; path
        // separators are rejected here rather than at load time.
        if module.contains(['/', '\\']) {
            return Err(invalid());
        }
        Ok(Self {
            module: module.to_owned(),
            function: function.to_owned(),
        })
    }

    /// Returns the module half, naming a code file stem.
    #[must_use]
    pub fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Returns the function half, naming the callable to invoke.
    #[must_use]
    pub fn function(&self) -> &str {
        self.function.as_str()
    }

    /// Returns the file name of the module's code file.
    #[must_use]
    pub fn module_file(&self) -> String {
        format!("{}.lua", self.module)
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}
