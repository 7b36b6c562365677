//! Configuration model for the specification generator.
//!
//! Every path the generator treats as "fixed" lives here so a device image
//! can relocate them through a single JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{AppcellError, Result};
use crate::types::InstanceId;

/// Root configuration for the generator and overlay builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Base runtime specification template.
    pub base_template: PathBuf,
    /// Graphics capability descriptor.
    pub graphics_descriptor: PathBuf,
    /// Directory holding one subdirectory per instance.
    pub overlay_root: PathBuf,
    /// Directory holding the per-instance IPC sockets.
    pub ipc_socket_dir: PathBuf,
    /// Hook launcher executable.
    pub launcher_path: PathBuf,
    /// `argv[0]` of the hook launcher.
    pub launcher_name: String,
    /// Working directory of the sandboxed process.
    pub working_dir: String,
    /// Container path the application storage is mounted at.
    pub storage_container_path: String,
    /// Group granting access to video devices.
    pub video_group: String,
    /// GID used when `video_group` cannot be resolved.
    pub default_video_gid: u32,
    /// Service account owning artifacts when no identity is supplied.
    pub service_user: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_template: PathBuf::from(constants::DEFAULT_BASE_TEMPLATE),
            graphics_descriptor: PathBuf::from(constants::DEFAULT_GRAPHICS_DESCRIPTOR),
            overlay_root: PathBuf::from(constants::DEFAULT_OVERLAY_ROOT),
            ipc_socket_dir: PathBuf::from(constants::DEFAULT_IPC_SOCKET_DIR),
            launcher_path: PathBuf::from(constants::DEFAULT_LAUNCHER_PATH),
            launcher_name: constants::DEFAULT_LAUNCHER_NAME.into(),
            working_dir: constants::DEFAULT_WORKING_DIR.into(),
            storage_container_path: constants::DEFAULT_STORAGE_PATH.into(),
            video_group: constants::DEFAULT_VIDEO_GROUP.into(),
            default_video_gid: constants::DEFAULT_VIDEO_GID,
            service_user: constants::DEFAULT_SERVICE_USER.into(),
        }
    }
}

impl GeneratorConfig {
    /// Loads a configuration file. Fields absent from the file keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AppcellError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| AppcellError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Directory holding every artifact of one instance.
    #[must_use]
    pub fn instance_dir(&self, id: &InstanceId) -> PathBuf {
        self.overlay_root.join(id.as_str())
    }

    /// Path of the generated runtime specification for an instance.
    #[must_use]
    pub fn spec_path(&self, id: &InstanceId) -> PathBuf {
        self.instance_dir(id).join(constants::SPEC_FILE_NAME)
    }

    /// Merged root filesystem mount point of an instance.
    #[must_use]
    pub fn rootfs_path(&self, id: &InstanceId) -> PathBuf {
        self.instance_dir(id).join(constants::ROOTFS_DIR_NAME)
    }

    /// IPC socket path of an instance.
    #[must_use]
    pub fn ipc_socket_path(&self, id: &InstanceId) -> PathBuf {
        self.ipc_socket_dir.join(format!("{id}.sock"))
    }
}
