//! Recursive directory creation with per-level ownership.

use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Component, Path};

use appcell_common::error::{AppcellError, Result};

/// Mode used for every directory created here; the process umask applies.
const DIR_MODE: u32 = 0o755;

/// Creates `path` and every missing segment below `base`.
///
/// `base` is created with default ownership if it is missing and is never
/// chowned. When both `uid` and `gid` are non-zero, every segment strictly
/// below `base` is chowned, whether this call created it or not, so an
/// instance tree left behind by an earlier run is re-owned.
///
/// Ownership failures are logged and do not fail the call.
///
/// # Errors
///
/// Returns an error if `path` is not inside `base`, or if creating a
/// segment fails for any reason other than it already existing.
pub fn create_directories(base: &Path, path: &Path, uid: u32, gid: u32) -> Result<()> {
    let relative = path.strip_prefix(base).map_err(|_| {
        AppcellError::config(format!(
            "{} is not inside {}",
            path.display(),
            base.display()
        ))
    })?;
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(AppcellError::config(format!(
            "{} escapes {}",
            path.display(),
            base.display()
        )));
    }

    std::fs::create_dir_all(base).map_err(|e| AppcellError::io(base, e))?;

    let chown_enabled = uid != 0 && gid != 0;
    let mut builder = std::fs::DirBuilder::new();
    let _ = builder.mode(DIR_MODE);

    let mut segment = base.to_path_buf();
    for component in relative.components() {
        segment.push(component);
        match builder.create(&segment) {
            Ok(()) => tracing::trace!(path = %segment.display(), "created directory"),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && segment.is_dir() => {}
            Err(e) => {
                tracing::error!(path = %segment.display(), error = %e, "failed to create directory");
                return Err(AppcellError::io(&segment, e));
            }
        }
        if chown_enabled {
            change_owner(&segment, uid, gid);
        }
    }
    Ok(())
}

fn change_owner(path: &Path, uid: u32, gid: u32) {
    use nix::unistd::{Gid, Uid, chown};

    if let Err(e) = chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid))) {
        tracing::warn!(path = %path.display(), uid, gid, error = %e, "failed to change directory owner");
    }
}
