//! End-to-end preparation of an application instance.
//!
//! Mounts the layered root and writes the spec next to it. If generation
//! fails the root is unmounted again before the error is returned.

use std::path::{Path, PathBuf};

use appcell_common::config::GeneratorConfig;
use appcell_common::types::{AppConfig, InstanceId};
use appcell_core::filesystem::overlayfs::{build_overlay_root, teardown_overlay_root};
use appcell_core::identity::IdentityResolver;

use crate::document::RuntimeSpec;
use crate::error::GenerateError;
use crate::generator::SpecGenerator;
use crate::package::load_package_manifest;

/// A mounted root filesystem and the spec describing how to run it.
#[derive(Debug, Clone)]
pub struct PreparedInstance {
    /// Merged root filesystem.
    pub rootfs: PathBuf,
    /// Generated specification file.
    pub spec_path: PathBuf,
    /// Generated specification.
    pub spec: RuntimeSpec,
}

/// Loads `manifest`, mounts the instance root and generates its spec.
///
/// # Errors
///
/// Returns an error if the manifest is unusable, the overlay cannot be
/// mounted, or generation fails. The overlay never outlives a failure.
pub fn prepare_instance(
    config: &GeneratorConfig,
    identity: &dyn IdentityResolver,
    app: &AppConfig,
    manifest: &Path,
) -> Result<PreparedInstance, GenerateError> {
    let packages = load_package_manifest(manifest).map_err(|e| {
        tracing::error!(path = %manifest.display(), error = %e, "package manifest rejected");
        GenerateError::Manifest(e)
    })?;
    let layers: Vec<PathBuf> = packages.iter().map(|p| p.mount_path.clone()).collect();

    let overlay = build_overlay_root(&config.overlay_root, &app.instance_id, &layers, app.uid, app.gid)
        .map_err(GenerateError::Overlay)?;
    let generated = SpecGenerator::new(config, identity).generate(app, &packages)?;

    tracing::info!(
        instance = %app.instance_id,
        rootfs = %overlay.path().display(),
        spec = %generated.path.display(),
        "instance prepared"
    );
    Ok(PreparedInstance {
        rootfs: overlay.release(),
        spec_path: generated.path,
        spec: generated.spec,
    })
}

/// Unmounts the root filesystem of `instance_id`.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
pub fn teardown_instance(config: &GeneratorConfig, instance_id: &InstanceId) -> Result<(), GenerateError> {
    teardown_overlay_root(&config.rootfs_path(instance_id)).map_err(GenerateError::Overlay)
}
