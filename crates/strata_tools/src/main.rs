//! Strata - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strata_core::config::EngineConfig;
use strata_tools::simulate::{run_simulation, SimulateOptions};
use strata_tools::validate::{format_report, validate_config, validate_data_directory};

#[derive(Parser)]
#[command(name = "strata-tools")]
#[command(about = "Development tools for the Strata engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and check every module in a data directory
    Validate {
        /// Path to data directory
        #[arg(default_value = "data")]
        path: PathBuf,

        /// Engine configuration file (overrides the path and module list)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only load these modules and their dependencies
        #[arg(short, long)]
        module: Vec<String>,

        /// Exit with an error when any check fails
        #[arg(long)]
        strict: bool,
    },

    /// Fire one missile in a test arena and print the tick trace
    Simulate {
        /// Missile type identifier
        #[arg(default_value = "arrow")]
        missile_type: String,

        /// Data directory to load content from (built-in fixtures if omitted)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Random seed
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Tick limit
        #[arg(short, long, default_value_t = 300)]
        ticks: u64,

        /// Distance to the target in tiles
        #[arg(long, default_value_t = 6)]
        distance: i32,

        /// Use expected values instead of random rolls
        #[arg(long)]
        no_randomness: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            path,
            config,
            module,
            strict,
        } => {
            let result = match config {
                Some(config_path) => EngineConfig::from_file(&config_path).and_then(|config| {
                    let mut config = config.with_env_overrides();
                    config.strict_checks |= strict;
                    tracing::info!("Validating data files in: {}", config.data_root.display());
                    validate_config(&config)
                }),
                None => {
                    tracing::info!("Validating data files in: {}", path.display());
                    validate_data_directory(&path, &module)
                }
            };

            match result {
                Ok(report) => {
                    println!("{}", format_report(&report));
                    if report.is_clean() {
                        tracing::info!("Validation passed");
                    } else if strict {
                        tracing::error!("Validation failed: {} check error(s)", report.errors.len());
                        std::process::exit(1);
                    } else {
                        tracing::warn!("Validation finished with {} check error(s)", report.errors.len());
                    }
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Simulate {
            missile_type,
            data,
            seed,
            ticks,
            distance,
            no_randomness,
        } => {
            let options = SimulateOptions {
                missile_type,
                data,
                seed,
                max_ticks: ticks,
                distance,
                no_randomness,
            };
            match run_simulation(&options) {
                Ok(trace) => println!("{trace}"),
                Err(e) => {
                    tracing::error!("Simulation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
