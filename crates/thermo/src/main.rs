mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use thermo_config::{ConfigCredentialStore, to_dial_config};
use thermo_core::{
    ControlSurface, CredentialPair, CredentialStore, MemoryCredentialStore, RobotConnector,
    TlsVerification,
};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// The control surface as wired up by the CLI.
pub type Surface = ControlSurface<RobotConnector, Arc<dyn CredentialStore>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never touch the device
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "thermo", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let surface = build_surface(&cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &surface, &cli.global).await;
            surface.shutdown().await;
            result
        }
    }
}

/// Build the control surface from the config file and CLI overrides.
fn build_surface(global: &GlobalOpts) -> Result<Surface, CliError> {
    let cfg = thermo_config::load_config_or_default();
    let mut settings = cfg.device;

    // Flag > env > config file
    if let Some(ref endpoint) = global.endpoint {
        settings.endpoint.clone_from(endpoint);
    }
    if let Some(ref component) = global.component {
        settings.component.clone_from(component);
    }
    if let Some(timeout) = global.timeout {
        settings.timeout = timeout;
    }

    let mut dial = to_dial_config(&settings)?;
    if global.insecure {
        dial.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(timeout) = global.timeout {
        dial.connect_timeout = dial.connect_timeout.max(Duration::from_secs(timeout));
    }

    let store = credential_store(global, &settings)?;
    Ok(ControlSurface::new(RobotConnector::new(&dial), store, &dial))
}

/// Flags take priority; otherwise the env → keyring → config chain.
fn credential_store(
    global: &GlobalOpts,
    settings: &thermo_config::DeviceSettings,
) -> Result<Arc<dyn CredentialStore>, CliError> {
    match (&global.api_key, &global.api_key_id) {
        (Some(key), Some(id)) => {
            let pair = CredentialPair::new(SecretString::from(key.clone()), id.clone())?;
            Ok(Arc::new(MemoryCredentialStore::new(Some(pair))))
        }
        (Some(_), None) => Err(CliError::Validation {
            field: "api-key-id".into(),
            reason: "--api-key needs --api-key-id".into(),
        }),
        _ => Ok(Arc::new(ConfigCredentialStore::new(settings))),
    }
}
