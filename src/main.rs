use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use autotestlab::config::{LabConfig, LoggingConfig};
use autotestlab::history::TestResult;
use autotestlab::lab::Lab;

#[derive(Parser)]
#[command(
    name = "autotestlab",
    about = "Test-run dashboard: run a suite, scrape pass/fail counts, keep a history",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "AUTOTESTLAB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard HTTP server
    Serve {
        /// Bind address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run the whole suite once and record the result
    Run {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Run every uploaded test file individually and record each result
    RunUploads {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Inspect or reset the run history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List recorded runs
    List {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Delete every recorded run
    Clear,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_table(records: &[TestResult]) {
    println!(
        "{:<25} | {:<24} | {:<6} | {:>6} | {:>6} | Exit",
        "Timestamp", "File", "Status", "Passed", "Failed"
    );
    println!("{:-<25}-|-{:-<24}-|-{:-<6}-|-{:-<6}-|-{:-<6}-|-{:-<4}", "", "", "", "", "", "");
    for r in records {
        let exit = r
            .returncode
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<25} | {:<24} | {:<6} | {:>6} | {:>6} | {}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            r.filename.as_deref().unwrap_or("(suite)"),
            r.status.to_string(),
            r.passed,
            r.failed,
            exit
        );
    }
}

fn print_records(records: &[TestResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        print_table(records);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = LabConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting AutoTestLab");
            autotestlab::serve(config).await?;
        }
        Commands::Run { json } => {
            let lab = Lab::new(&config);
            let record = lab.run_suite().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{}", record.stdout);
                println!(
                    "Test {}: {} passed, {} failed",
                    record.status, record.passed, record.failed
                );
            }
        }
        Commands::RunUploads { json } => {
            let lab = Lab::new(&config);
            let files = lab.uploads.list().await?;
            if files.is_empty() {
                if json {
                    println!("[]");
                } else {
                    println!("No uploaded test files in {}.", lab.uploads.dir().display());
                }
                return Ok(());
            }

            let mut records = Vec::with_capacity(files.len());
            for path in files {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                tracing::info!(%name, "Running uploaded test file");
                records.push(lab.run_file(path, name).await?);
            }
            print_records(&records, json)?;
        }
        Commands::History { action } => {
            let lab = Lab::new(&config);
            match action {
                HistoryAction::List { json } => {
                    let records = lab.history.read_all().await;
                    if records.is_empty() && !json {
                        println!("No test runs recorded.");
                    } else {
                        print_records(&records, json)?;
                    }
                }
                HistoryAction::Clear => {
                    lab.history.clear().await?;
                    println!("History cleared.");
                }
            }
        }
    }

    Ok(())
}
