//! The specification generator.
//!
//! Runs the seven generation stages in order and stops at the first fatal
//! failure. Nothing is written unless every fatal stage succeeded.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use appcell_common::config::GeneratorConfig;
use appcell_common::constants::{
    DISPLAY_SOCKET_ENV, IPC_SOCKET_ENV, RUNTIME_DIR_ENV, STORAGE_PATH_ENV,
};
use appcell_common::error::{AppcellError, Result};
use appcell_common::types::{AppConfig, PackageRef};
use appcell_core::filesystem::dirs::create_directories;
use appcell_core::filesystem::document::load_document;
use appcell_core::identity::IdentityResolver;
use appcell_core::memory::parse_memory_size;

use crate::builder::SpecBuilder;
use crate::document::{IdMapping, Mount, RuntimeSpec, User};
use crate::error::GenerateError;
use crate::graphics::{GraphicsDescriptor, apply_graphics};
use crate::hooks::apply_hooks;
use crate::limits::OverrideTable;
use crate::package::PackageMetadata;

/// A persisted specification.
#[derive(Debug, Clone)]
pub struct GeneratedSpec {
    /// Where the document was written.
    pub path: PathBuf,
    /// The document itself.
    pub spec: RuntimeSpec,
}

/// Generates runtime specifications for application instances.
///
/// Holds no per-instance state, so one generator may serve concurrent
/// launches on separate threads.
#[derive(Clone, Copy)]
pub struct SpecGenerator<'a> {
    config: &'a GeneratorConfig,
    identity: &'a dyn IdentityResolver,
}

impl<'a> SpecGenerator<'a> {
    /// Creates a generator over the given configuration and identity source.
    #[must_use]
    pub fn new(config: &'a GeneratorConfig, identity: &'a dyn IdentityResolver) -> Self {
        Self { config, identity }
    }

    /// Builds the specification for `app` and writes it to the instance's
    /// spec path, owned by the application's uid/gid.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage failure. No file is created or
    /// modified when an error is returned.
    pub fn generate(
        &self,
        app: &AppConfig,
        packages: &[PackageRef],
    ) -> std::result::Result<GeneratedSpec, GenerateError> {
        let spec = self.build(app, packages)?;
        let path = self.config.spec_path(&app.instance_id);
        let persist = |e: AppcellError| {
            tracing::error!(path = %path.display(), error = %e, "cannot write runtime specification");
            GenerateError::Persist(e)
        };

        create_directories(
            &self.config.overlay_root,
            &self.config.instance_dir(&app.instance_id),
            app.uid,
            app.gid,
        )
        .map_err(persist)?;
        spec.persist(&path, app.uid, app.gid).map_err(persist)?;
        Ok(GeneratedSpec { path, spec })
    }

    /// Builds the specification for `app` without writing it.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage failure.
    pub fn build(
        &self,
        app: &AppConfig,
        packages: &[PackageRef],
    ) -> std::result::Result<RuntimeSpec, GenerateError> {
        let instance = &app.instance_id;
        tracing::info!(app = %app.app_id, instance = %instance, packages = packages.len(), "generating runtime specification");

        let mut builder = load_document(&self.config.base_template)
            .and_then(SpecBuilder::from_template)
            .map_err(|e| {
                tracing::error!(path = %self.config.base_template.display(), error = %e, "base specification template missing");
                GenerateError::BaseTemplate(e)
            })?;

        let graphics = GraphicsDescriptor::load(&self.config.graphics_descriptor).map_err(|e| {
            tracing::error!(path = %self.config.graphics_descriptor.display(), error = %e, "graphics descriptor missing or unreadable");
            GenerateError::GraphicsDescriptor(e)
        })?;

        match apply_graphics(&mut builder, &graphics, self.identity) {
            Ok(report) if report.is_usable() => {
                tracing::debug!(devices = report.devices, groups = report.groups, files = report.files, "graphics block applied");
            }
            Ok(_) => tracing::warn!(instance = %instance, "no graphics device node could be granted"),
            Err(e) => tracing::warn!(instance = %instance, error = %e, "graphics block not applied"),
        }

        merge_packages(&mut builder, packages).map_err(|e| {
            tracing::error!(instance = %instance, error = %e, "package contributions could not be merged");
            GenerateError::Package(e)
        })?;

        apply_hooks(&mut builder, self.config, &self.config.spec_path(instance)).map_err(|e| {
            tracing::error!(instance = %instance, error = %e, "lifecycle hooks could not be generated");
            GenerateError::Hooks(e)
        })?;

        self.apply_overrides(&mut builder, app).map_err(|e| {
            tracing::error!(instance = %instance, error = %e, "runtime overrides failed");
            GenerateError::Overrides(e)
        })?;

        Ok(builder.finish())
    }

    /// Applies identity, display, storage and IPC settings. Runs last so it
    /// overrides anything earlier stages wrote.
    fn apply_overrides(&self, builder: &mut SpecBuilder, app: &AppConfig) -> Result<()> {
        let video_gid = self
            .identity
            .group_id(&self.config.video_group)
            .unwrap_or_else(|e| {
                tracing::warn!(group = %self.config.video_group, default = self.config.default_video_gid, error = %e, "using default video gid");
                self.config.default_video_gid
            });
        builder.set_user(&User {
            uid: 0,
            gid: 0,
            additional_gids: vec![video_gid],
        })?;
        builder.set_hostname(&app.app_id);
        builder.set_cwd(&self.config.working_dir)?;
        builder.add_uid_mapping(IdMapping::single(0, app.uid))?;
        builder.add_gid_mapping(IdMapping::single(0, app.gid))?;

        if !app.display_socket.is_absolute() {
            return Err(AppcellError::config(format!(
                "display socket {} is not an absolute path",
                app.display_socket.display()
            )));
        }
        let socket_name = app
            .display_socket
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| {
                AppcellError::config(format!(
                    "display socket {} has no file name",
                    app.display_socket.display()
                ))
            })?;
        builder.push_env(DISPLAY_SOCKET_ENV, socket_name)?;
        if let Some(dir) = app.display_socket.parent() {
            builder.push_env(RUNTIME_DIR_ENV, &dir.display().to_string())?;
        }
        bind_same_path(builder, &app.display_socket)?;

        let storage = self.config.storage_container_path.as_str();
        builder.push_env("HOME", storage)?;
        builder.add_mount(&Mount::bind(app.storage_path.display().to_string(), storage))?;
        builder.push_env(STORAGE_PATH_ENV, storage)?;

        let ipc = self.config.ipc_socket_path(&app.instance_id);
        bind_same_path(builder, &ipc)?;
        builder.push_env(IPC_SOCKET_ENV, &ipc.display().to_string())?;
        Ok(())
    }
}

/// Merges each package's declarations in manifest order, then resolves
/// the memory override table.
fn merge_packages(builder: &mut SpecBuilder, packages: &[PackageRef]) -> Result<()> {
    let mut memory = OverrideTable::default();

    for package in packages {
        let meta = match PackageMetadata::load(&package.metadata_path) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(path = %package.metadata_path.display(), error = %e, "skipping package without readable metadata");
                continue;
            }
        };

        if let Some(entry_point) = meta.entry_point.as_deref().filter(|e| !e.is_empty()) {
            builder.push_arg(entry_point)?;
        }
        for permission in &meta.permissions {
            builder.add_capability(permission)?;
        }
        for configuration in &meta.configurations {
            builder.push_env_entry(configuration.to_env_entry())?;
        }
        for entry in &meta.env_variables {
            builder.push_env_entry(entry.clone())?;
        }
        if let Some(limit) = meta.memory_limit.as_deref() {
            match parse_memory_size(limit) {
                0 => tracing::warn!(path = %package.metadata_path.display(), limit, "ignoring unparsable memory limit"),
                bytes => memory.record(meta.package_type, bytes),
            }
        }
    }

    if let Some(bytes) = memory.resolve() {
        builder.set_memory_limit(bytes)?;
    }
    Ok(())
}

fn bind_same_path(builder: &mut SpecBuilder, path: &Path) -> Result<()> {
    let path = path.display().to_string();
    builder.add_mount(&Mount::bind(&path, &path))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use appcell_common::types::InstanceId;
    use serde_json::{Value, json};

    use super::*;

    struct NoGroups;

    impl IdentityResolver for NoGroups {
        fn group_id(&self, name: &str) -> Result<u32> {
            Err(AppcellError::NotFound {
                kind: "group",
                id: name.into(),
            })
        }

        fn user_identity(&self, name: &str) -> Result<(u32, u32)> {
            Err(AppcellError::NotFound {
                kind: "user",
                id: name.into(),
            })
        }
    }

    fn setup(dir: &Path) -> GeneratorConfig {
        let template = dir.join("base.json");
        let gpu = dir.join("gpu.json");
        std::fs::write(&template, json!({"process": {"args": [], "env": []}}).to_string())
            .expect("template");
        std::fs::write(&gpu, json!({"vendorGpuSupport": {}}).to_string()).expect("gpu");
        GeneratorConfig {
            base_template: template,
            graphics_descriptor: gpu,
            overlay_root: dir.join("containers"),
            ipc_socket_dir: dir.join("ipc"),
            ..GeneratorConfig::default()
        }
    }

    fn app(id: &str) -> AppConfig {
        AppConfig {
            app_id: "com.example.player".into(),
            uid: 1000,
            gid: 1000,
            instance_id: InstanceId::new(id).expect("instance id"),
            display_socket: "/run/user/1000/wayland-0".into(),
            storage_path: "/data/apps/player".into(),
        }
    }

    fn metadata(dir: &Path, name: &str, value: &Value) -> PackageRef {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).expect("metadata");
        PackageRef {
            metadata_path: path,
            mount_path: dir.join(name).with_extension(""),
        }
    }

    #[test]
    fn video_gid_falls_back_to_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let spec = SpecGenerator::new(&config, &NoGroups)
            .build(&app("a"), &[])
            .expect("build");
        assert_eq!(
            spec.pointer("/process/user"),
            Some(&json!({"uid": 0, "gid": 0, "additionalGids": [44]}))
        );
    }

    #[test]
    fn application_memory_limit_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let packages = [
            metadata(dir.path(), "app.json", &json!({"packageType": "application", "memoryLimit": "256M"})),
            metadata(dir.path(), "rt.json", &json!({"packageType": "runtime", "memoryLimit": "1G"})),
        ];
        let spec = SpecGenerator::new(&config, &NoGroups)
            .build(&app("a"), &packages)
            .expect("build");
        assert_eq!(
            spec.pointer("/linux/resources/memory/limit"),
            Some(&json!(256 * 1024 * 1024))
        );
    }

    #[test]
    fn unparsable_memory_limit_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let packages = [metadata(dir.path(), "rt.json", &json!({"memoryLimit": "lots"}))];
        let spec = SpecGenerator::new(&config, &NoGroups)
            .build(&app("a"), &packages)
            .expect("build");
        assert!(spec.pointer("/linux/resources/memory/limit").is_none());
    }

    #[test]
    fn configurations_append_without_dedup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let packages = [
            metadata(dir.path(), "one.json", &json!({"configurations": [{"key": "MODE", "value": "base"}]})),
            metadata(dir.path(), "two.json", &json!({
                "configurations": [{"key": "MODE", "value": "app"}],
                "envVariables": ["EXTRA=1"]
            })),
        ];
        let spec = SpecGenerator::new(&config, &NoGroups)
            .build(&app("a"), &packages)
            .expect("build");
        let env: Vec<&str> = spec
            .pointer("/process/env")
            .and_then(Value::as_array)
            .map(|e| e.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        assert_eq!(&env[..3], ["MODE=base", "MODE=app", "EXTRA=1"]);
    }

    #[test]
    fn malformed_package_type_or_limit_keeps_entry_points() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let packages = [
            metadata(dir.path(), "one.json", &json!({"entryPoint": "/bin/app1", "packageType": "base"})),
            metadata(dir.path(), "two.json", &json!({"entryPoint": "/bin/app2", "memoryLimit": 268_435_456})),
        ];
        let spec = SpecGenerator::new(&config, &NoGroups)
            .build(&app("a"), &packages)
            .expect("build");
        assert_eq!(spec.pointer("/process/args"), Some(&json!(["/bin/app1", "/bin/app2"])));
        assert!(spec.pointer("/linux/resources/memory/limit").is_none());
    }

    #[test]
    fn display_socket_without_name_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let mut broken = app("a");
        broken.display_socket = "/".into();
        let err = SpecGenerator::new(&config, &NoGroups)
            .build(&broken, &[])
            .expect_err("no socket name");
        assert!(matches!(err, GenerateError::Overrides(_)));
    }

    #[test]
    fn relative_display_socket_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let mut relative = app("a");
        relative.display_socket = "wayland-0".into();
        let err = SpecGenerator::new(&config, &NoGroups)
            .build(&relative, &[])
            .expect_err("relative socket");
        assert!(matches!(err, GenerateError::Overrides(_)));
    }

    #[test]
    fn resolved_groups_are_used() {
        struct Video;
        impl IdentityResolver for Video {
            fn group_id(&self, name: &str) -> Result<u32> {
                HashMap::from([("video", 39)]).get(name).copied().ok_or_else(|| {
                    AppcellError::NotFound {
                        kind: "group",
                        id: name.into(),
                    }
                })
            }

            fn user_identity(&self, _name: &str) -> Result<(u32, u32)> {
                Ok((0, 0))
            }
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let config = setup(dir.path());
        let spec = SpecGenerator::new(&config, &Video)
            .build(&app("a"), &[])
            .expect("build");
        assert_eq!(spec.pointer("/process/user/additionalGids"), Some(&json!([39])));
    }
}
