mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::run::RunArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "charm-ft",
    about = "Functional tests for Juju charms: deploy, relate, upgrade and poke the charm, then check its status",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the juju binary (default: `juju` on PATH)
    #[arg(long, global = true, env = "JUJU_BINARY")]
    juju: Option<PathBuf>,

    /// Model to test in (default: the controller's current model)
    #[arg(long, short = 'm', global = true, env = "JUJU_MODEL")]
    model: Option<String>,

    /// Charm repository; local builds live under `<repository>/builds/<charm>`
    #[arg(long, global = true, env = "JUJU_REPOSITORY", default_value = ".")]
    repository: PathBuf,

    /// Suite config file (YAML)
    #[arg(long, global = true, env = "CHARM_FT_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenarios across the test matrix
    Run(RunArgs),

    /// Show the (series × source) cases
    Matrix,

    /// List scenarios in execution order
    Scenarios,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = cmd::Settings {
        juju: cli.juju,
        model: cli.model,
        repository: cli.repository,
        config: cli.config,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(&settings, args),
        Commands::Matrix => cmd::matrix::run(&settings),
        Commands::Scenarios => cmd::scenarios::run(settings.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
