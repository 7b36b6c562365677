//! CLI command definitions and dispatch.

pub mod generate;
pub mod memory;
pub mod prepare;
pub mod teardown;

use std::path::{Path, PathBuf};

use anyhow::Context;
use appcell_common::config::GeneratorConfig;
use appcell_common::constants::DEFAULT_CONFIG_FILE;
use appcell_common::types::{AppConfig, InstanceId};
use appcell_core::identity::{IdentityResolver, resolve_service_identity};
use clap::{Args, Parser, Subcommand};

/// appcell — prepares sandboxed application instances.
#[derive(Parser, Debug)]
#[command(name = "appcell", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the generator configuration file.
    #[arg(long, global = true, env = "APPCELL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mount the instance root and generate its runtime specification.
    Prepare(prepare::PrepareArgs),
    /// Generate the runtime specification only.
    Generate(generate::GenerateArgs),
    /// Unmount an instance root.
    Teardown(teardown::TeardownArgs),
    /// Show how a memory limit string is interpreted.
    ParseMemory(memory::ParseMemoryArgs),
}

/// Identity and per-instance settings shared by `prepare` and `generate`.
#[derive(Args, Debug)]
pub struct InstanceArgs {
    /// Application identifier, used as hostname.
    #[arg(long)]
    pub app_id: String,

    /// Unique instance identifier.
    #[arg(long)]
    pub instance_id: String,

    /// Host UID of the application; defaults to the service account.
    #[arg(long)]
    pub uid: Option<u32>,

    /// Host GID of the application; defaults to the service account.
    #[arg(long)]
    pub gid: Option<u32>,

    /// Host path of the display server socket.
    #[arg(long)]
    pub display_socket: PathBuf,

    /// Host path of the application's persistent storage.
    #[arg(long)]
    pub storage: PathBuf,
}

impl InstanceArgs {
    /// Resolves the arguments into an [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the instance id is invalid, or if an identity
    /// was omitted and the service account cannot be resolved.
    pub fn to_app_config(
        &self,
        config: &GeneratorConfig,
        identity: &dyn IdentityResolver,
    ) -> anyhow::Result<AppConfig> {
        let (uid, gid) = match (self.uid, self.gid) {
            (Some(uid), Some(gid)) => (uid, gid),
            (uid, gid) => {
                let (service_uid, service_gid) =
                    resolve_service_identity(identity, &config.service_user)
                        .context("no --uid/--gid given and the service account is unavailable")?;
                (uid.unwrap_or(service_uid), gid.unwrap_or(service_gid))
            }
        };
        Ok(AppConfig {
            app_id: self.app_id.clone(),
            uid,
            gid,
            instance_id: InstanceId::new(self.instance_id.as_str())?,
            display_socket: self.display_socket.clone(),
            storage_path: self.storage.clone(),
        })
    }
}

/// Loads the configuration named on the command line, falling back to the
/// system file and then to built-in defaults.
///
/// # Errors
///
/// Returns an error if an explicitly named or present file cannot be loaded.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<GeneratorConfig> {
    let path = match explicit {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
        None => {
            tracing::debug!("no configuration file, using defaults");
            return Ok(GeneratorConfig::default());
        }
    };
    GeneratorConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Prepare(args) => prepare::execute(&config, &args),
        Command::Generate(args) => generate::execute(&config, &args),
        Command::Teardown(args) => teardown::execute(&config, &args),
        Command::ParseMemory(args) => {
            memory::execute(&args);
            Ok(())
        }
    }
}
