//! Core library for `capgate`, a policy-gated task dispatch kernel.
//!
//! Specs describing invocable capabilities live in an [`registry::IdentityRegistry`].
//! A [`execution::TaskExecutor`] resolves a task's target, asks the
//! [`policy::PolicyEngine`] whether the subject may perform the action the
//! spec kind implies, and dispatches to the [`ports::Runtime`] registered
//! under the spec's runtime name.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod execution;
pub mod kernel;
pub mod policy;
pub mod ports;
pub mod registry;

use clap::Parser;

pub use kernel::Kernel;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_on_missing_explicit_config() {
        let result = run([
            "capgate",
            "--config",
            "/nonexistent/capgate.yaml",
            "describe",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["capgate", "unknown"]);
        assert!(result.is_err());
    }
}
