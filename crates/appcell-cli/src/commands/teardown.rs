//! `appcell teardown` — unmount an instance root.

use appcell_common::config::GeneratorConfig;
use appcell_common::types::InstanceId;
use appcell_spec::instance::teardown_instance;
use clap::Args;

/// Arguments for the `teardown` command.
#[derive(Args, Debug)]
pub struct TeardownArgs {
    /// Instance whose root filesystem is unmounted.
    #[arg(long)]
    pub instance_id: String,
}

/// Executes the `teardown` command.
///
/// # Errors
///
/// Returns an error if the instance id is invalid or the unmount fails.
pub fn execute(config: &GeneratorConfig, args: &TeardownArgs) -> anyhow::Result<()> {
    let id = InstanceId::new(args.instance_id.as_str())?;
    teardown_instance(config, &id)?;
    Ok(())
}
