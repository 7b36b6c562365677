//! `appcell prepare` — mount the instance root and generate its spec.

use std::path::PathBuf;

use appcell_common::config::GeneratorConfig;
use appcell_core::identity::SystemIdentity;
use appcell_spec::instance::prepare_instance;
use clap::Args;

use super::InstanceArgs;
use crate::output::emit;

/// Arguments for the `prepare` command.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Package manifest listing the instance's layers.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Instance identity and paths.
    #[command(flatten)]
    pub instance: InstanceArgs,
}

/// Executes the `prepare` command, printing the bundle directory.
///
/// # Errors
///
/// Returns an error if the manifest, overlay mount or spec generation fails.
pub fn execute(config: &GeneratorConfig, args: &PrepareArgs) -> anyhow::Result<()> {
    let identity = SystemIdentity;
    let app = args.instance.to_app_config(config, &identity)?;
    let prepared = prepare_instance(config, &identity, &app, &args.manifest)?;
    emit(&config.instance_dir(&app.instance_id).display().to_string());
    tracing::debug!(rootfs = %prepared.rootfs.display(), spec = %prepared.spec_path.display(), "bundle ready");
    Ok(())
}
