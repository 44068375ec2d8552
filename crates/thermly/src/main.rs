mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use thermly_core::Controller;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    let result = match cli.command {
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Completions(args) => {
            print_completions(args.shell);
            Ok(())
        }
        cmd => run_session(cmd, &cli.global).await,
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Default filter directive for `-v` count and `--quiet`; `RUST_LOG` wins.
fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(global: &GlobalOpts) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(global.verbose, global.quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_completions(shell: Shell) {
    clap_complete::generate(shell, &mut Cli::command(), "thermly", &mut std::io::stdout());
}

/// Run one command against a live controller; the session is dropped
/// however the command ends.
async fn run_session(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = Controller::new(config::build_controller_config(global)?)?;

    tracing::debug!(command = ?cmd, "running command");
    let result = commands::dispatch(cmd, &controller, global).await;
    controller.disconnect().await;
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_onto_levels() {
        assert_eq!(log_filter(0, false), "warn");
        assert_eq!(log_filter(1, false), "info");
        assert_eq!(log_filter(2, false), "debug");
        assert_eq!(log_filter(7, false), "trace");
    }

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(log_filter(0, true), "error");
        assert_eq!(log_filter(3, true), "error");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
