//! Device node inspection.
//!
//! Major/minor numbers are read from the node itself rather than declared
//! statically, so passthrough follows whatever the kernel assigned.

use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use appcell_common::error::{AppcellError, Result};
use appcell_common::types::{DeviceKind, DeviceNode};

/// Stats `path` and returns its device type and numbers.
///
/// Symlinks are followed, matching how the container runtime will open
/// the node.
///
/// # Errors
///
/// Returns an error if the path cannot be stat'ed or is neither a
/// character nor a block device.
pub fn query_device_node(path: &Path) -> Result<DeviceNode> {
    let meta = std::fs::metadata(path).map_err(|e| AppcellError::io(path, e))?;
    let file_type = meta.file_type();
    let kind = if file_type.is_char_device() {
        DeviceKind::Character
    } else if file_type.is_block_device() {
        DeviceKind::Block
    } else {
        return Err(AppcellError::NotFound {
            kind: "device node",
            id: path.display().to_string(),
        });
    };

    let rdev = meta.rdev();
    Ok(DeviceNode {
        path: path.to_path_buf(),
        kind,
        major: nix::sys::stat::major(rdev),
        minor: nix::sys::stat::minor(rdev),
    })
}
