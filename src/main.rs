use std::process::ExitCode;

use clap::Parser;
use roo::app::{App, Invocation};
use roo::cli::Cli;
use roo::identity::sts::StsIdentityProvider;
use roo::{RooError, Settings};
use tracing::{subscriber, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli, settings).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e}");
            if matches!(e, RooError::MissingCommand) {
                eprintln!("Please provide a command to execute, e.g.:");
                eprintln!("roo --role my_role_name -- aws sts get-caller-identity");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> roo::Result<i32> {
    tracing::debug!(?settings, "starting");

    let config = App::load_config(&settings)?;

    let base_profile = cli
        .profile
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| Some(config.default_profile.clone()));
    let provider = StsIdentityProvider::new(base_profile);

    let invocation = Invocation {
        role: cli.role,
        code: cli.code,
        list: cli.list,
        force_refresh: cli.refresh,
        write_profile: cli.write_profile,
        target_profile: cli.target_profile,
        command: cli.command,
    };

    let app = App::new(settings, config, Box::new(provider));
    let outcome = app.run(&invocation).await?;
    Ok(outcome.exit_code())
}

fn init_logging(settings: &Settings) -> anyhow::Result<()> {
    let level = if settings.debug {
        Level::DEBUG
    } else if settings.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Allow RUST_LOG env var to override the verbosity flags
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(settings.debug)
        .with_file(settings.debug)
        .with_line_number(settings.debug)
        .compact()
        .finish();

    subscriber::set_global_default(subscriber)?;

    Ok(())
}
