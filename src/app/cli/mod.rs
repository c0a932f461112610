//! CLI Adapter.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::app::api::ConvertResult;
use crate::domain::{AppError, Settings, SettingsOverrides};

#[derive(Parser)]
#[command(name = "prebake")]
#[command(version)]
#[command(
    about = "Convert a template to boot from pre-built images instead of installing software at boot",
    long_about = None
)]
struct Cli {
    /// Template to convert
    input_template: PathBuf,
    /// Where to write the converted template
    output_template: PathBuf,
    /// Template parameters, e.g. "KeyName=heat_key;InstanceType=m1.large"
    #[arg(short = 'p', long)]
    parameters: Option<String>,
    /// Image registry host
    #[arg(short = 'H', long)]
    glance_host: Option<String>,
    /// Image registry port
    #[arg(short = 'P', long)]
    glance_port: Option<u16>,
    /// Directory holding build descriptors (.tdl)
    #[arg(long)]
    descriptor_dir: Option<PathBuf>,
    /// Directory where the image builder writes disk images
    #[arg(long)]
    image_dir: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Entry point for the CLI.
pub fn run() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version print to stdout and succeed; everything else is a usage error.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.debug);

    if let Err(e) = run_convert(cli, effective_user_is_root, Settings::from_env) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,prebake={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn effective_user_is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

fn run_convert<P, S>(cli: Cli, is_privileged: P, load_settings: S) -> Result<ConvertResult, AppError>
where
    P: Fn() -> bool,
    S: FnOnce(SettingsOverrides) -> Result<Settings, AppError>,
{
    debug!("Converting {} to {}", cli.input_template.display(), cli.output_template.display());
    if !is_privileged() {
        return Err(AppError::InsufficientPrivileges);
    }

    let settings = load_settings(SettingsOverrides {
        registry_host: cli.glance_host,
        registry_port: cli.glance_port,
        parameters: cli.parameters,
        descriptor_dir: cli.descriptor_dir,
        image_dir: cli.image_dir,
        debug: cli.debug,
    })?;
    debug!("{:?}", settings);

    let result = crate::app::api::convert(&settings, &cli.input_template, &cli.output_template)?;
    for image in &result.images {
        info!("{} now boots from {} ({})", image.resource, image.registry_name, image.registry_id);
    }
    info!("Wrote converted template to {}", result.output.display());
    Ok(result)
}
