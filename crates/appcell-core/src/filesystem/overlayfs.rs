//! `OverlayFS` instance roots.
//!
//! Each instance gets `<root>/<id>/{rootfs,upper,work}`. The package mount
//! paths become the read-only lower layers in caller order, so the first
//! path is the lowest layer.

use std::path::{Path, PathBuf};

use appcell_common::constants::{ROOTFS_DIR_NAME, UPPER_DIR_NAME, WORK_DIR_NAME};
use appcell_common::error::{AppcellError, Result};
use appcell_common::types::InstanceId;

use super::dirs::create_directories;

/// Directory layout of an instance's `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLayout {
    /// Read-only lower layers (bottom to top).
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayLayout {
    /// Derives the layout for `instance_id` under `root`.
    #[must_use]
    pub fn for_instance(root: &Path, instance_id: &InstanceId, lower_dirs: &[PathBuf]) -> Self {
        let base = root.join(instance_id.as_str());
        Self {
            lower_dirs: lower_dirs.to_vec(),
            upper_dir: base.join(UPPER_DIR_NAME),
            work_dir: base.join(WORK_DIR_NAME),
            merged_dir: base.join(ROOTFS_DIR_NAME),
        }
    }

    /// Renders the `lowerdir=..,upperdir=..,workdir=..` mount data.
    #[must_use]
    pub fn mount_options(&self) -> String {
        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }
}

/// A mounted instance root. Unmounted on drop unless [`released`](Self::release).
#[derive(Debug)]
pub struct OverlayMount {
    merged_dir: PathBuf,
    armed: bool,
}

impl OverlayMount {
    /// Merged mount point.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.merged_dir
    }

    /// Keeps the filesystem mounted past this guard and returns its path.
    #[must_use]
    pub fn release(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.merged_dir)
    }
}

impl Drop for OverlayMount {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = teardown_overlay_root(&self.merged_dir) {
                tracing::warn!(path = %self.merged_dir.display(), error = %e, "overlay cleanup failed");
            }
        }
    }
}

/// Creates the instance directories and mounts the merged root.
///
/// # Errors
///
/// Returns an error if no lower layer is given, if directory creation
/// fails, or if the mount syscall fails.
pub fn build_overlay_root(
    root: &Path,
    instance_id: &InstanceId,
    mount_paths: &[PathBuf],
    uid: u32,
    gid: u32,
) -> Result<OverlayMount> {
    if mount_paths.is_empty() {
        return Err(AppcellError::config(format!(
            "instance {instance_id} has no package layers"
        )));
    }
    let layout = OverlayLayout::for_instance(root, instance_id, mount_paths);
    for dir in [&layout.merged_dir, &layout.work_dir, &layout.upper_dir] {
        create_directories(root, dir, uid, gid)?;
    }

    mount_overlay(&layout)?;
    tracing::info!(
        instance = %instance_id,
        merged = %layout.merged_dir.display(),
        layers = layout.lower_dirs.len(),
        "overlayfs mounted"
    );
    Ok(OverlayMount {
        merged_dir: layout.merged_dir,
        armed: true,
    })
}

#[cfg(target_os = "linux")]
fn mount_overlay(layout: &OverlayLayout) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    let opts = layout.mount_options();
    mount(
        Some("overlay"),
        &layout.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| {
        tracing::error!(merged = %layout.merged_dir.display(), error = %e, "overlay mount failed");
        AppcellError::Sys {
            operation: "mount",
            path: layout.merged_dir.clone(),
            source: e.into(),
        }
    })
}

#[cfg(not(target_os = "linux"))]
fn mount_overlay(_layout: &OverlayLayout) -> Result<()> {
    Err(AppcellError::config("Linux required for overlay mounts"))
}

/// Unmounts an instance root at `merged_dir`.
///
/// Uses `MNT_DETACH` so a busy root is lazily detached.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
#[cfg(target_os = "linux")]
pub fn teardown_overlay_root(merged_dir: &Path) -> Result<()> {
    nix::mount::umount2(merged_dir, nix::mount::MntFlags::MNT_DETACH).map_err(|e| {
        tracing::error!(path = %merged_dir.display(), error = %e, "overlay unmount failed");
        AppcellError::Sys {
            operation: "umount",
            path: merged_dir.to_path_buf(),
            source: e.into(),
        }
    })?;
    tracing::info!(path = %merged_dir.display(), "overlayfs unmounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error, unmounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn teardown_overlay_root(_merged_dir: &Path) -> Result<()> {
    Err(AppcellError::config("Linux required for overlay mounts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> InstanceId {
        InstanceId::new(value).expect("instance id")
    }

    #[test]
    fn layout_is_keyed_by_instance() {
        let layers = vec![PathBuf::from("/pkg/base")];
        let a = OverlayLayout::for_instance(Path::new("/run/appcell"), &id("a"), &layers);
        let b = OverlayLayout::for_instance(Path::new("/run/appcell"), &id("b"), &layers);
        assert_eq!(a.merged_dir, PathBuf::from("/run/appcell/a/rootfs"));
        assert_eq!(a.upper_dir, PathBuf::from("/run/appcell/a/upper"));
        assert_eq!(a.work_dir, PathBuf::from("/run/appcell/a/work"));
        assert_ne!(a.merged_dir, b.merged_dir);
    }

    #[test]
    fn mount_options_keep_layer_order() {
        let layers = vec![
            PathBuf::from("/pkg/runtime"),
            PathBuf::from("/pkg/app"),
        ];
        let layout = OverlayLayout::for_instance(Path::new("/r"), &id("x"), &layers);
        assert_eq!(
            layout.mount_options(),
            "lowerdir=/pkg/runtime:/pkg/app,upperdir=/r/x/upper,workdir=/r/x/work"
        );
    }

    #[test]
    fn empty_layer_list_is_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = build_overlay_root(dir.path(), &id("empty"), &[], 0, 0).expect_err("no layers");
        assert!(matches!(err, AppcellError::Config { .. }));
        assert!(!dir.path().join("empty").exists());
    }

    #[test]
    fn teardown_of_plain_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = teardown_overlay_root(dir.path()).expect_err("not a mount point");
        assert!(matches!(err, AppcellError::Sys { operation: "umount", .. }));
    }
}
