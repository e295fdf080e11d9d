use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbperf::aggregate::Aggregator;
use dbperf::chart::render_all;
use dbperf::config::SessionConfig;
use dbperf::render::{renderer_for, OutputFormat};
use dbperf::report::{print_ingest_report, print_results, print_violations};
use dbperf::store::BenchmarkStore;
use dbperf::tabular::{read_rows, write_records};
use dbperf::timing::TimingModel;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dbperf")]
#[command(about = "Compare query performance across database engines")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic benchmark records into a CSV file
    Generate {
        /// Session config (JSON); the built-in e-commerce session when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of trials per query and database
        #[arg(short, long)]
        trials: Option<usize>,

        /// Override the random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output CSV file
        #[arg(short, long, default_value = "./output/results.csv")]
        output: PathBuf,
    },

    /// Ingest a results CSV and render the report
    Report {
        /// Results CSV in the canonical schema
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for charts
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Chart format
        #[arg(short, long, value_enum, default_value = "svg")]
        format: OutputFormat,
    },

    /// Generate a synthetic session and report on it in one step
    Run {
        /// Session config (JSON); the built-in e-commerce session when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for charts and results.csv
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Chart format
        #[arg(short, long, value_enum, default_value = "svg")]
        format: OutputFormat,

        /// Override the number of trials per query and database
        #[arg(short, long)]
        trials: Option<usize>,

        /// Override the random seed
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Write the built-in session config as a starting point
    Config {
        /// Output JSON file
        #[arg(short, long, default_value = "./dbperf.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            config,
            trials,
            seed,
            output,
        } => {
            let config = load_config(config.as_deref(), trials, seed)?;
            let store = generate(&config)?;
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).context("Failed to create output directory")?;
            }
            write_records(&output, store.all())?;
            println!("Wrote {} records to {}", store.len(), output.display());
        }
        Commands::Report {
            input,
            output,
            format,
        } => {
            let rows = read_rows(&input)?;
            let mut store = BenchmarkStore::new();
            let ingest = store.extend_from(rows);
            print_ingest_report(&ingest);
            report(&store, &output, format)?;
        }
        Commands::Run {
            config,
            output,
            format,
            trials,
            seed,
        } => {
            let config = load_config(config.as_deref(), trials, seed)?;
            let store = generate(&config)?;
            std::fs::create_dir_all(&output).context("Failed to create output directory")?;
            let csv_path = output.join("results.csv");
            write_records(&csv_path, store.all())?;
            println!("Wrote {} records to {}", store.len(), csv_path.display());
            report(&store, &output, format)?;
        }
        Commands::Config { output } => {
            SessionConfig::default().save(&output)?;
            println!("Wrote default config to {}", output.display());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(
    path: Option<&Path>,
    trials: Option<usize>,
    seed: Option<u64>,
) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(trials) = trials {
        config.trials = trials;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }

    println!("\nSession Configuration:");
    println!("  Queries: {}", config.queries.len());
    println!("  Databases: {}", config.databases.len());
    println!("  Trials: {}", config.trials);
    println!("  Random seed: {}", config.seed);
    Ok(config)
}

fn generate(config: &SessionConfig) -> Result<BenchmarkStore> {
    let store = config
        .generate(&TimingModel::default())
        .context("Failed to generate session")?;
    info!(records = store.len(), "session generated");
    Ok(store)
}

fn report(store: &BenchmarkStore, output_dir: &Path, format: OutputFormat) -> Result<()> {
    print_violations(store);

    let engine = Aggregator::new(store);
    print_results(&engine);

    let mut renderer = renderer_for(format, output_dir)?;
    println!("\nGenerating charts ({})...", renderer.renderer_name());
    let rendered = render_all(renderer.as_mut(), &engine)?;
    println!("\nReport complete! {} charts written", rendered.len());
    Ok(())
}
