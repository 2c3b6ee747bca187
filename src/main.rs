use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use quantum_sched::config::{JobConfig, Quantum, SchedulerConfig};
use quantum_sched::launcher::{Launcher, RunReport, TokioSpawner};
use quantum_sched::scheduler::OrderingPolicy;
use quantum_sched::worker::StdoutSink;

/// Log filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "quantum-sched")]
#[command(version)]
#[command(about = "Single-gate, shortest-job-first, quantum-sliced job scheduler")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a job set to completion
    Run {
        #[command(flatten)]
        jobs: JobArgs,

        /// Maximum number of job tasks that may be spawned
        #[arg(long)]
        max_tasks: Option<usize>,

        /// Output format for the final summary
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },

    /// Print the order in which jobs would be spawned
    Order {
        #[command(flatten)]
        jobs: JobArgs,

        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },
}

// =============================================================================
// Job Set Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct JobArgs {
    /// Job in NAME:RUNTIME_MS[:INDICATOR] form (repeatable).
    /// Without --job or --jobs-file the built-in four-task set is used.
    #[arg(long = "job", short = 'j')]
    job: Vec<String>,

    /// JSON file with an array of {"name", "runtime_ms", "indicator"}
    #[arg(long)]
    jobs_file: Option<PathBuf>,

    /// Time slice per turn in milliseconds
    #[arg(long, default_value = "1000", conflicts_with = "run_to_completion")]
    quantum_ms: u64,

    /// Let every job run its whole runtime in a single turn
    #[arg(long)]
    run_to_completion: bool,

    /// Pause between a job's turns in milliseconds
    #[arg(long, default_value = "1000")]
    inter_turn_ms: u64,

    /// Order in which jobs are spawned
    #[arg(long, default_value = "shortest-first")]
    ordering: Ordering,
}

#[derive(Debug, Clone, ValueEnum)]
enum Ordering {
    ShortestFirst,
    AsGiven,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct OrderOutput {
    position: usize,
    name: String,
    runtime_ms: u64,
    indicator: u32,
}

// =============================================================================
// Helper Functions
// =============================================================================

async fn build_config(args: JobArgs) -> Result<SchedulerConfig, Box<dyn std::error::Error>> {
    let mut jobs = Vec::new();
    if let Some(path) = &args.jobs_file {
        jobs.extend(SchedulerConfig::jobs_from_json_file(path).await?);
    }
    for raw in &args.job {
        jobs.push(JobConfig::parse(raw)?);
    }

    let mut config = if jobs.is_empty() {
        SchedulerConfig::default()
    } else {
        SchedulerConfig {
            jobs,
            ..SchedulerConfig::default()
        }
    };

    config.quantum = if args.run_to_completion {
        Quantum::Unbounded
    } else {
        Quantum::Fixed(args.quantum_ms)
    };
    config.inter_turn_delay_ms = args.inter_turn_ms;
    config.ordering = match args.ordering {
        Ordering::ShortestFirst => OrderingPolicy::ShortestFirst,
        Ordering::AsGiven => OrderingPolicy::AsGiven,
    };

    Ok(config)
}

fn print_report(
    report: &RunReport,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Table => {
            println!();
            println!("{:<16} {:>10} {:>6} {:>14}  TURNS", "JOB", "RUNTIME", "LED", "COMPLETED AT");
            println!("{}", "-".repeat(70));
            for job in &report.jobs {
                let completed = job
                    .completed_at_ms
                    .map(|ms| format!("{}ms", ms))
                    .unwrap_or_else(|| "-".to_string());
                let turns: Vec<String> = job.turns.iter().map(|t| t.to_string()).collect();
                println!(
                    "{:<16} {:>8}ms {:>6} {:>14}  [{}]",
                    job.identity,
                    job.total_runtime,
                    job.indicator,
                    completed,
                    turns.join(", ")
                );
            }
            println!();
            println!(
                "Gate: {} acquires, {} releases",
                report.gate.acquires, report.gate.releases
            );
            for failure in &report.failures {
                println!("Failed: {}", failure);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Diagnostic lines go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            jobs,
            max_tasks,
            output,
        } => {
            let config = build_config(jobs).await?;
            let spawner = match max_tasks {
                Some(max) => TokioSpawner::with_max_tasks(max),
                None => TokioSpawner::new(),
            };
            let launcher = Launcher::new(&config)?
                .with_diagnostics(Arc::new(StdoutSink))
                .with_spawner(Arc::new(spawner));

            let report = launcher.run().await;
            print_report(&report, &output)?;
            report.into_result()?;
        }
        Commands::Order { jobs, output } => {
            let config = build_config(jobs).await?;
            let launcher = Launcher::new(&config)?;
            let order: Vec<OrderOutput> = launcher
                .job_set()
                .jobs()
                .iter()
                .enumerate()
                .map(|(i, spec)| OrderOutput {
                    position: i + 1,
                    name: spec.identity().to_string(),
                    runtime_ms: spec.total_runtime(),
                    indicator: spec.indicator().0,
                })
                .collect();
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&order)?),
                OutputFormat::Table => {
                    for entry in &order {
                        println!(
                            "{:>3}. {:<16} {:>8}ms  LED {}",
                            entry.position, entry.name, entry.runtime_ms, entry.indicator
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
