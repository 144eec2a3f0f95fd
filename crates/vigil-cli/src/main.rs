//! vigil: periodic health and stall probe for a node service.
//!
//! Meant to be run by a timer, not to loop: each invocation checks the
//! service once, updates the state file, prints what it found and exits
//! with 0 (healthy), 1 (degraded) or 2 (down or unreachable).
//!
//! # Usage
//!
//! ```text
//! vigil check --state-path /var/lib/vigil/health_state.json --stall-minutes 20
//! vigil state show
//! ```

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

use args::ProbeArgs;

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Health and stall probe for a long-running node service",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    probe: ProbeArgs,

    /// Log output format (logs go to stderr).
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Log probe progress, not just problems.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the probe once (the default when no command is given)
    Check {
        /// Report format: text or json
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,
        /// Do not run the alert command
        #[arg(long)]
        no_alert: bool,
    },
    /// Inspect or reset the persisted stall-detection state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Print the persisted state as JSON
    Show,
    /// Delete the state file so the next run starts fresh
    Reset,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            // The probe could not evaluate health at all.
            eprintln!("vigil: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = cli.probe.resolve()?;

    match cli.command {
        None => commands::check::run(config, ReportFormat::Text, true).await,
        Some(Commands::Check { format, no_alert }) => {
            commands::check::run(config, format, !no_alert).await
        }
        Some(Commands::State { action }) => match action {
            StateAction::Show => commands::state::show(&config),
            StateAction::Reset => commands::state::reset(&config),
        },
    }
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default = if verbose { "info,vigil=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_check() {
        let cli = Cli::try_parse_from(["vigil"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn check_flags_parse() {
        let cli =
            Cli::try_parse_from(["vigil", "check", "--format", "json", "--no-alert"]).unwrap();
        match cli.command {
            Some(Commands::Check { format, no_alert }) => {
                assert_eq!(format, ReportFormat::Json);
                assert!(no_alert);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn probe_args_are_global() {
        let cli = Cli::try_parse_from([
            "vigil",
            "state",
            "show",
            "--state-path",
            "/tmp/vigil-state.json",
        ])
        .unwrap();
        let config = cli.probe.resolve().unwrap();
        assert_eq!(
            config.state_path,
            std::path::PathBuf::from("/tmp/vigil-state.json")
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
