//! Package manifests and per-package metadata.

use std::path::{Path, PathBuf};

use appcell_common::error::{AppcellError, Result};
use appcell_common::types::{PackageRef, PackageType};
use appcell_core::filesystem::document::load_document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    pkg_meta_data_path: PathBuf,
    pkg_mount_path: PathBuf,
}

/// Loads the packages of an instance, in manifest order.
///
/// The order is significant: the first package is the lowest overlay
/// layer and the first to contribute to the spec.
///
/// # Errors
///
/// Returns an error if the manifest cannot be parsed, has no `packages`
/// list, or an entry lacks one of its two paths.
pub fn load_package_manifest(path: &Path) -> Result<Vec<PackageRef>> {
    let mut doc = load_document(path)?;
    let packages = doc
        .get_mut("packages")
        .filter(|p| p.is_array())
        .map(Value::take)
        .ok_or_else(|| AppcellError::NotFound {
            kind: "packages list",
            id: path.display().to_string(),
        })?;
    let entries: Vec<ManifestEntry> =
        serde_json::from_value(packages).map_err(|e| AppcellError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    tracing::debug!(path = %path.display(), packages = entries.len(), "loaded package manifest");
    Ok(entries
        .into_iter()
        .map(|e| PackageRef {
            metadata_path: e.pkg_meta_data_path,
            mount_path: e.pkg_mount_path,
        })
        .collect())
}

/// A `{key, value}` pair exported to the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Configuration {
    /// Variable name.
    pub key: String,
    /// Variable value; non-string JSON values are rendered as JSON text.
    pub value: Value,
}

impl Configuration {
    /// Renders the pair as `KEY=VALUE`.
    #[must_use]
    pub fn to_env_entry(&self) -> String {
        match &self.value {
            Value::String(s) => format!("{}={s}", self.key),
            other => format!("{}={other}", self.key),
        }
    }
}

/// Metadata a package declares about itself.
///
/// Every field is optional and parsed on its own: a field with an
/// unexpected value falls back to its default with a warning and never
/// takes the other fields down with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageMetadata {
    /// Executable appended to `process.args`.
    #[serde(deserialize_with = "lenient")]
    pub entry_point: Option<String>,
    /// Capabilities requested.
    #[serde(deserialize_with = "lenient")]
    pub permissions: Vec<String>,
    /// Variables exported as `KEY=VALUE`.
    #[serde(deserialize_with = "lenient")]
    pub configurations: Vec<Configuration>,
    /// Override slot this package's limits land in.
    #[serde(deserialize_with = "lenient")]
    pub package_type: PackageType,
    /// Memory limit such as `256M`.
    #[serde(deserialize_with = "lenient")]
    pub memory_limit: Option<String>,
    /// Preformatted `KEY=VALUE` entries.
    #[serde(deserialize_with = "lenient")]
    pub env_variables: Vec<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value.clone()).unwrap_or_else(|e| {
        tracing::warn!(value = %value, error = %e, "ignoring malformed package metadata field");
        T::default()
    }))
}

impl PackageMetadata {
    /// Loads a package metadata document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = load_document(path)?;
        serde_json::from_value(doc).map_err(|e| AppcellError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
