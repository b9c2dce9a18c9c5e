//! bootstrap - dev106 container entrypoint.
//!
//! Runs as PID 1 in a freshly started container:
//! - Maps DEV_UID/DEV_GID onto the dev106 user (passwd, group, shadow)
//! - Chowns DEV_CHOWN and the home directory, minus DEV_CHOWNEXCLUDE
//! - Then reaps zombies forever, or execs the given command in its place

use std::ffi::OsString;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dev106_bootstrap::config::BootstrapConfig;
use dev106_bootstrap::init;

#[derive(Parser)]
#[command(name = "bootstrap")]
#[command(about = "dev106 container init: identity mapping, chown, zombie reaping")]
#[command(
    after_help = "ENVIRONMENT:\n  DEV_UID, DEV_GID     Host user ids (bootstrap skipped if unset)\n  DEV_CHOWN            Colon-separated directories to chown\n  DEV_CHOWNEXCLUDE     Colon-separated paths to leave alone\n  DEV_HOME, DEV_USER   Container home and user name\n  RUST_LOG             Log filter (default: info)\n\nA leading -h/--help is answered here. Use `bootstrap -- COMMAND --help` to\npass it to the workload."
)]
struct Cli {
    /// Command to exec in place of the init loop
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<OsString>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "bootstrap starting"
    );

    match BootstrapConfig::from_env() {
        Ok(config) => {
            if !init::is_privileged() {
                warn!("not running as root, bootstrap will likely fail");
            }
            match init::bootstrap(&config) {
                Ok(()) => info!("container initialized"),
                Err(e) => error!("bootstrap failed, continuing without it: {e}"),
            }
        }
        Err(e) => {
            warn!("{e}");
            warn!("skipping identity mapping and chown");
        }
    }

    if cli.command.is_empty() {
        match init::run_init_loop() {
            Ok(never) => match never {},
            Err(e) => {
                error!("init loop could not start: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let err = init::exec_command(&cli.command);
    error!("{err}");
    ExitCode::from(err.exit_code())
}
