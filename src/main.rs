// Entrypoint for the CLI application.
// - Parses arguments, sets up logging, resolves configuration.
// - Runs exactly one command and prints its result.

use clap::FromArgMatches;
use pxforge::cli::{self, Cli};
use pxforge::commands::{self, AppContext};
use pxforge::config::Config;
use pxforge::ui::{self, Spinner};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::new(cli.api_url, cli.registry);
    debug!(
        "Backend {} registry {}",
        config.base_url,
        config.registry_path.display()
    );
    let ctx = AppContext::new(&config)?;

    let mut spinner = Spinner::new();
    let outcome = commands::execute(cli.command, &ctx, &mut spinner);
    spinner.finish();
    Ok(ui::present(&outcome))
}
