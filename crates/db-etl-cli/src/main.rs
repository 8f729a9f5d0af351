//! db-etl CLI - run a configured transfer between two databases.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use db_etl::{Config, EtlError, EventSink, LoadReport, Pipeline, PipelineEvent, TracingSink};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "db-etl")]
#[command(about = "Configuration-driven data transfer between SQLite, MySQL and PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to YAML or JSON configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print pipeline events as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the transfer
    Run {
        /// Override loading.batch_size
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Load and validate the configuration without connecting
    Validate,

    /// Test database connections
    HealthCheck,
}

/// Prints every event as one JSON line on stderr, then logs it.
struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, event: &PipelineEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            eprintln!("{}", line);
        }
        TracingSink.emit(event);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<u8, EtlError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(EtlError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Validate => {
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Configuration is valid");
                println!("  Source: {}", config.source_db.describe());
                println!("  Target: {}", config.target_db.describe());
                println!("  Table: {}", config.loading.target_table);
                println!("  Batch size: {}", config.loading.batch_size);
            }
            Ok(0)
        }

        Commands::HealthCheck => {
            Pipeline::new(config).health_check().await?;
            println!("Health check passed: source and target reachable");
            Ok(0)
        }

        Commands::Run { batch_size } => {
            if let Some(size) = batch_size {
                config.loading.batch_size = size;
                config.validate()?;
            }

            let mut pipeline = Pipeline::new(config);
            if cli.progress {
                pipeline = pipeline.with_sink(Arc::new(JsonLinesSink));
            }

            let report = pipeline.run().await;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }

            Ok(report.exit_code())
        }
    }
}

fn print_report(report: &LoadReport) {
    if report.succeeded {
        println!("\nTransfer completed!");
    } else {
        println!("\nTransfer failed!");
    }
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    println!(
        "  Rows: {} loaded / {} extracted",
        report.rows_loaded, report.rows_extracted
    );
    println!(
        "  Batches: {}/{}",
        report.batches, report.batches_expected
    );
    if report.table_created {
        println!("  Table created");
    }
    if report.table_truncated {
        println!("  Table truncated before load");
    }
    for warning in &report.warnings {
        println!("  Warning: {:?}", warning);
    }
    if let (Some(kind), Some(message)) = (report.error, &report.error_message) {
        eprintln!("{} (state {}): {}", kind, report.final_state, message);
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => {
            return Err(format!(
                "unknown log format '{}' (expected text or json)",
                other
            ))
        }
    }

    Ok(())
}
