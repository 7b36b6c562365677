//! `appcell generate` — write the runtime specification without mounting.

use std::path::PathBuf;

use anyhow::Context;
use appcell_common::config::GeneratorConfig;
use appcell_core::identity::SystemIdentity;
use appcell_spec::generator::SpecGenerator;
use appcell_spec::package::load_package_manifest;
use clap::Args;

use super::InstanceArgs;
use crate::output::emit;

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Package manifest listing the instance's packages.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Print the document instead of writing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Instance identity and paths.
    #[command(flatten)]
    pub instance: InstanceArgs,
}

/// Executes the `generate` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or generation fails.
pub fn execute(config: &GeneratorConfig, args: &GenerateArgs) -> anyhow::Result<()> {
    let identity = SystemIdentity;
    let app = args.instance.to_app_config(config, &identity)?;
    let packages = load_package_manifest(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    let generator = SpecGenerator::new(config, &identity);

    if args.dry_run {
        let spec = generator.build(&app, &packages)?;
        emit(&spec.to_json_pretty()?);
    } else {
        let generated = generator.generate(&app, &packages)?;
        emit(&generated.path.display().to_string());
    }
    Ok(())
}

