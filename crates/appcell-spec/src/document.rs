//! OCI runtime specification fragments and the finished document.

use std::fs::Permissions;
use std::io::{BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use appcell_common::error::{AppcellError, Result};
use appcell_common::types::DeviceNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mode of the persisted specification file.
const SPEC_FILE_MODE: u32 = 0o644;

/// Entry of the top-level `mounts` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Path inside the container.
    pub destination: String,
    /// Filesystem type.
    #[serde(rename = "type")]
    pub mount_type: String,
    /// Host source path.
    pub source: String,
    /// Mount options.
    pub options: Vec<String>,
}

impl Mount {
    /// A recursive read-write bind mount.
    #[must_use]
    pub fn bind(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            mount_type: "bind".into(),
            source: source.into(),
            options: vec!["rbind".into(), "nosuid".into(), "nodev".into()],
        }
    }

    /// A recursive read-only bind mount.
    #[must_use]
    pub fn bind_readonly(source: impl Into<String>, destination: impl Into<String>) -> Self {
        let mut mount = Self::bind(source, destination);
        mount.options.push("ro".into());
        mount
    }
}

/// Entry of `linux.devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxDevice {
    /// Device path inside the container.
    pub path: String,
    /// `c` or `b`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Kernel major number.
    pub major: u64,
    /// Kernel minor number.
    pub minor: u64,
    /// Permission bits of the created node.
    pub file_mode: u32,
    /// Owner of the created node.
    pub uid: u32,
    /// Group of the created node.
    pub gid: u32,
}

impl From<&DeviceNode> for LinuxDevice {
    fn from(node: &DeviceNode) -> Self {
        Self {
            path: node.path.display().to_string(),
            device_type: node.kind.code().into(),
            major: node.major,
            minor: node.minor,
            file_mode: 0o666,
            uid: 0,
            gid: 0,
        }
    }
}

/// Entry of `linux.resources.devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRule {
    /// Whether the rule grants access.
    pub allow: bool,
    /// `c` or `b`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Kernel major number.
    pub major: u64,
    /// Kernel minor number.
    pub minor: u64,
    /// Access string, e.g. `rwm`.
    pub access: String,
}

impl From<&DeviceNode> for DeviceRule {
    fn from(node: &DeviceNode) -> Self {
        Self {
            allow: true,
            device_type: node.kind.code().into(),
            major: node.major,
            minor: node.minor,
            access: "rwm".into(),
        }
    }
}

/// Entry of `linux.uidMappings` / `linux.gidMappings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMapping {
    /// First ID inside the container.
    #[serde(rename = "containerID")]
    pub container_id: u32,
    /// First ID on the host.
    #[serde(rename = "hostID")]
    pub host_id: u32,
    /// Number of IDs mapped.
    pub size: u32,
}

impl IdMapping {
    /// Maps a single ID.
    #[must_use]
    pub const fn single(container_id: u32, host_id: u32) -> Self {
        Self {
            container_id,
            host_id,
            size: 1,
        }
    }
}

/// Entry of a `hooks.<stage>` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    /// Executable invoked by the runtime.
    pub path: String,
    /// Full argument vector, including `argv[0]`.
    pub args: Vec<String>,
}

/// `process.user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// UID inside the container.
    pub uid: u32,
    /// GID inside the container.
    pub gid: u32,
    /// Supplementary GIDs.
    pub additional_gids: Vec<u32>,
}

/// A completed runtime specification.
///
/// Only [`crate::builder::SpecBuilder::finish`] produces one; it cannot be
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSpec {
    document: Value,
}

impl RuntimeSpec {
    pub(crate) const fn new(document: Value) -> Self {
        Self { document }
    }

    /// The document tree.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.document
    }

    /// Looks up a value by JSON pointer, e.g. `/process/args`.
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.document.pointer(pointer)
    }

    /// Renders the document as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }

    /// Writes the document to `path` and hands it to `uid`:`gid`.
    ///
    /// The document goes to a temporary file next to `path` and is renamed
    /// into place, so readers never observe a partial file. Ownership
    /// failures are logged and leave the written file in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be created, written or renamed.
    pub fn persist(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(".config.")
            .tempfile_in(dir)
            .map_err(|e| AppcellError::io(dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.document)?;
            writer.flush().map_err(|e| AppcellError::io(path, e))?;
        }
        tmp.as_file()
            .set_permissions(Permissions::from_mode(SPEC_FILE_MODE))
            .map_err(|e| AppcellError::io(path, e))?;
        let _ = tmp
            .persist(path)
            .map_err(|e| AppcellError::io(path, e.error))?;

        if let Err(e) = nix::unistd::chown(
            path,
            Some(nix::unistd::Uid::from_raw(uid)),
            Some(nix::unistd::Gid::from_raw(gid)),
        ) {
            tracing::warn!(path = %path.display(), uid, gid, error = %e, "failed to change spec owner");
        }
        tracing::info!(path = %path.display(), "runtime specification written");
        Ok(())
    }
}
