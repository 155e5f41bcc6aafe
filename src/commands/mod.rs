//! Command dispatch and handlers.

pub mod check;
pub mod describe;
pub mod events;
pub mod rules;
pub mod run;

use std::env;
use std::path::Path;

use tracing::debug;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::cli::{Cli, Command};
use crate::config::{default_config_path, KernelConfig, CONFIG_ENV};
use crate::kernel::Kernel;
use crate::ports::FileSystem;

/// Dispatch a parsed command line to its handler.
///
/// The kernel is booted from `--config`, then `CAPGATE_CONFIG`, then
/// `./capgate.yaml`. With none of those present a bare kernel is used.
///
/// # Errors
///
/// Returns an error string if the kernel cannot boot or the command fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let kernel = boot_kernel(cli.config.as_deref(), &LiveFileSystem)?;
    dispatch_with_kernel(&cli.command, &kernel)
}

/// Dispatch a command against an already booted kernel.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_kernel(command: &Command, kernel: &Kernel) -> Result<(), String> {
    match command {
        Command::Check {
            subject,
            action,
            resource,
            context,
        } => check::run(kernel, subject, action, resource, context),
        Command::Rules => rules::run(kernel),
        Command::Describe => describe::run(kernel),
        Command::Run {
            target,
            subject,
            workspace,
            input,
            context,
        } => {
            let request = run::RunRequest {
                subject: subject.as_deref(),
                workspace: workspace.as_deref(),
                input,
                context,
            };
            run::run(kernel, target, &request)
        }
        Command::Events { event_type } => events::run(kernel, event_type.as_deref()),
    }
}

/// Boots a kernel for the CLI.
///
/// An explicit path or `CAPGATE_CONFIG` must point at a readable file; the
/// implicit `./capgate.yaml` is optional.
///
/// # Errors
///
/// Returns an error string if a required config is missing or invalid.
pub fn boot_kernel(explicit: Option<&Path>, fs: &dyn FileSystem) -> Result<Kernel, String> {
    let required = explicit.is_some() || env::var_os(CONFIG_ENV).is_some();
    let path = explicit.map_or_else(default_config_path, Path::to_path_buf);

    if !required && !fs.exists(&path) {
        debug!(path = %path.display(), "no config file, using a bare kernel");
        return Ok(Kernel::new());
    }

    let config = KernelConfig::load(fs, &path).map_err(|e| e.to_string())?;
    Kernel::from_config(&config, fs).map_err(|e| e.to_string())
}
