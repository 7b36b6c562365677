//! Domain primitive types used across the appcell workspace.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique identifier of an application instance.
///
/// Every per-instance artifact (overlay directories, generated spec, IPC
/// socket) is keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct InstanceId(String);

impl InstanceId {
    /// Creates a new instance ID from a string value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty or would escape its parent
    /// directory when used as a path segment.
    pub fn new(id: impl Into<String>) -> crate::error::Result<Self> {
        let id = id.into();
        if id.is_empty() || id == "." || id == ".." || id.contains('/') {
            return Err(crate::error::AppcellError::config(format!(
                "invalid instance id: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for InstanceId {
    type Error = crate::error::AppcellError;

    fn try_from(id: String) -> crate::error::Result<Self> {
        Self::new(id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity and per-instance configuration of the application to launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application identifier, used as the container hostname.
    pub app_id: String,
    /// Host UID the sandbox root maps to.
    pub uid: u32,
    /// Host GID the sandbox root maps to.
    pub gid: u32,
    /// Unique instance identifier.
    pub instance_id: InstanceId,
    /// Host path of the display server socket.
    pub display_socket: PathBuf,
    /// Host path of the application's persistent storage.
    pub storage_path: PathBuf,
}

/// A package participating in an instance, as listed by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    /// Path of the package metadata document.
    pub metadata_path: PathBuf,
    /// Path where the package contents are mounted read-only.
    pub mount_path: PathBuf,
}

/// Kind of a device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Character device.
    Character,
    /// Block device.
    Block,
}

impl DeviceKind {
    /// Returns the single-letter type code used by OCI device entries.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Character => "c",
            Self::Block => "b",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character => write!(f, "character"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// A device node resolved from the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceNode {
    /// Path of the device node.
    pub path: PathBuf,
    /// Character or block device.
    pub kind: DeviceKind,
    /// Kernel major number.
    pub major: u64,
    /// Kernel minor number.
    pub minor: u64,
}

/// Type of a package, deciding which override slot its limits land in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// A runtime the application runs on.
    #[default]
    Runtime,
    /// The application itself; its overrides beat runtime overrides.
    Application,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_rejects_path_components() {
        assert!(InstanceId::new("").is_err());
        assert!(InstanceId::new("..").is_err());
        assert!(InstanceId::new("a/b").is_err());
        assert_eq!(InstanceId::new("app-1").map(|i| i.to_string()).ok(), Some("app-1".into()));
    }

    #[test]
    fn instance_id_deserialization_validates() {
        assert!(serde_json::from_str::<InstanceId>("\"../x\"").is_err());
        assert!(serde_json::from_str::<InstanceId>("\"\"").is_err());
        let id: InstanceId = serde_json::from_str("\"app-1\"").expect("valid id");
        assert_eq!(id.as_str(), "app-1");
    }

    #[test]
    fn app_config_with_escaping_instance_id_is_rejected() {
        let raw = serde_json::json!({
            "app_id": "com.example.player",
            "uid": 1000,
            "gid": 1000,
            "instance_id": "..",
            "display_socket": "/run/user/1000/wayland-0",
            "storage_path": "/data/apps/player"
        });
        assert!(serde_json::from_value::<AppConfig>(raw).is_err());
    }

    #[test]
    fn device_kind_codes() {
        assert_eq!(DeviceKind::Character.code(), "c");
        assert_eq!(DeviceKind::Block.code(), "b");
    }

    #[test]
    fn package_type_parses_lowercase() {
        let ty: PackageType = serde_json::from_str("\"application\"").unwrap_or_default();
        assert_eq!(ty, PackageType::Application);
    }
}
