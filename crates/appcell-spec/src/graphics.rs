//! Graphics capability descriptor and its application to a spec.
//!
//! The descriptor is device-wide: the same GPU nodes, groups and vendor
//! files are granted to every application instance.

use std::path::{Path, PathBuf};

use appcell_common::error::{AppcellError, Result};
use appcell_core::filesystem::device::query_device_node;
use appcell_core::filesystem::document::load_document;
use appcell_core::identity::IdentityResolver;
use serde::Deserialize;
use serde_json::Value;

use crate::builder::SpecBuilder;
use crate::document::{IdMapping, Mount};

/// Parsed `vendorGpuSupport` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicsDescriptor {
    /// Device nodes to pass through.
    #[serde(default)]
    pub dev_nodes: Vec<PathBuf>,
    /// Groups whose GIDs must be mapped into the container.
    #[serde(default)]
    pub group_ids: Vec<String>,
    /// Extra files to bind mount. Kept raw so malformed entries can be
    /// skipped individually.
    #[serde(default)]
    pub files: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorFile {
    vendor_gpu_support: GraphicsDescriptor,
}

impl GraphicsDescriptor {
    /// Loads the descriptor document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, not JSON, or lacks the
    /// `vendorGpuSupport` block.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = load_document(path)?;
        let file: DescriptorFile = serde_json::from_value(doc).map_err(|e| AppcellError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(file.vendor_gpu_support)
    }
}

/// What the graphics block contributed to a spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsReport {
    /// Device nodes granted.
    pub devices: usize,
    /// Group mappings added.
    pub groups: usize,
    /// File mounts added.
    pub files: usize,
}

impl GraphicsReport {
    /// At least one device node was granted.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.devices > 0
    }
}

/// Applies the descriptor to `builder`.
///
/// Unresolvable nodes and groups and malformed file entries are skipped
/// with a warning. Every touched section is checked before anything is
/// written, so a failure leaves `builder` unchanged.
///
/// # Errors
///
/// Returns an error only if the document under construction has the wrong
/// shape for one of the touched sections.
pub fn apply_graphics(
    builder: &mut SpecBuilder,
    descriptor: &GraphicsDescriptor,
    identity: &dyn IdentityResolver,
) -> Result<GraphicsReport> {
    let nodes: Vec<_> = descriptor
        .dev_nodes
        .iter()
        .filter_map(|path| match query_device_node(path) {
            Ok(node) => Some((path, node)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping device node");
                None
            }
        })
        .collect();

    let gids: Vec<u32> = descriptor
        .group_ids
        .iter()
        .filter_map(|name| match identity.group_id(name) {
            Ok(gid) => Some(gid),
            Err(e) => {
                tracing::warn!(group = %name, error = %e, "skipping device group");
                None
            }
        })
        .collect();

    let mounts: Vec<Mount> = descriptor
        .files
        .iter()
        .filter_map(|entry| {
            let source = entry.get("source").and_then(Value::as_str);
            let destination = entry.get("destination").and_then(Value::as_str);
            match (source, destination) {
                (Some(source), Some(destination)) if !source.is_empty() && !destination.is_empty() => {
                    Some(Mount::bind_readonly(source, destination))
                }
                _ => {
                    tracing::warn!(entry = %entry, "skipping malformed graphics file entry");
                    None
                }
            }
        })
        .collect();

    if !nodes.is_empty() {
        builder.check_list(&["linux", "devices"])?;
        builder.check_list(&["linux", "resources", "devices"])?;
    }
    if !gids.is_empty() {
        builder.check_list(&["linux", "gidMappings"])?;
    }
    if !mounts.is_empty() {
        builder.check_list(&["mounts"])?;
    }

    for (path, node) in &nodes {
        builder.add_device(node)?;
        tracing::debug!(
            path = %path.display(),
            kind = %node.kind,
            major = node.major,
            minor = node.minor,
            "granted device node"
        );
    }
    for gid in &gids {
        builder.add_gid_mapping(IdMapping::single(*gid, *gid))?;
    }
    for mount in &mounts {
        builder.add_mount(mount)?;
    }

    Ok(GraphicsReport {
        devices: nodes.len(),
        groups: gids.len(),
        files: mounts.len(),
    })
}
