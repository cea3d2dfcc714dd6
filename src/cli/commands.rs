//! CLI command definitions for ds-forge.
//!
//! `run` drives a dataset through the clean → model → critique pipeline;
//! `summarize` prints the dataset summary the Preparer would see.

use std::future::Future;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agents::{Critic, Modeler, Preparer};
use crate::data::{CsvAnalyzer, DataSummary, DatasetAnalyzer, DatasetReference};
use crate::llm::{ChatClient, StructuredInference};
use crate::pipeline::{Orchestrator, RunReport, RunResult, RunSettings};

const BANNER_WIDTH: usize = 55;

/// Automated data-science pipeline driven by cooperating LLM workers.
#[derive(Parser)]
#[command(name = "ds-forge")]
#[command(about = "Clean a tabular dataset and iterate a training script until a critic approves it")]
#[command(version)]
#[command(
    long_about = "ds-forge summarizes a CSV dataset, asks an LLM to fix a target and feature schema, then alternates between a modeler and a critic until a training script is approved or the retry budget is spent.\n\nExample usage:\n  ds-forge run --dataset train.csv --retries 5\n  ds-forge summarize --dataset train.csv --json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the full pipeline on a dataset.
    Run(RunArgs),

    /// Print the statistical summary of a dataset without calling any model.
    #[command(alias = "describe")]
    Summarize(SummarizeArgs),
}

/// Arguments for `ds-forge run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path of the CSV dataset to analyze (e.g. train.csv).
    #[arg(short, long)]
    pub dataset: String,

    /// Maximum number of rejected candidates before giving up.
    #[arg(short, long, env = "FORGE_MAX_RETRIES")]
    pub retries: Option<u32>,

    /// LLM model to use for all workers.
    #[arg(short, long, env = "FORGE_MODEL")]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "LITELLM_API_BASE")]
    pub api_base: Option<String>,

    /// API key (falls back to LITELLM_API_KEY / OPENROUTER_API_KEY).
    #[arg(long)]
    pub api_key: Option<String>,

    /// Write the approved script to this file.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print the full run report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `ds-forge summarize`.
#[derive(Parser, Debug)]
pub struct SummarizeArgs {
    /// Path of the CSV dataset.
    #[arg(short, long)]
    pub dataset: String,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Parse CLI arguments without running any command.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_pipeline_command(args).await,
        Commands::Summarize(args) => run_summarize_command(args).await,
    }
}

fn resolve_settings(args: &RunArgs) -> anyhow::Result<RunSettings> {
    let mut settings = RunSettings::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    if let Some(retries) = args.retries {
        settings.orchestrator.max_retries = retries;
    }
    if let Some(model) = &args.model {
        settings.llm.model = model.clone();
    }
    if let Some(api_base) = &args.api_base {
        settings.llm.api_base = api_base.clone();
    }
    if let Some(api_key) = &args.api_key {
        settings.llm.api_key = Some(api_key.clone());
    }

    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(settings)
}

async fn run_pipeline_command(args: RunArgs) -> anyhow::Result<()> {
    let settings = resolve_settings(&args)?;
    let dataset = DatasetReference::new(&args.dataset);

    if settings.llm.api_key.is_none() {
        warn!("No API key configured; requests are sent unauthenticated");
    }
    let client = ChatClient::new(
        settings.llm.api_base.clone(),
        settings.llm.api_key.clone(),
        settings.llm.model.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize LLM client: {}", e))?;

    let inference = StructuredInference::new(Arc::new(client), settings.llm.inference_settings());
    let orchestrator = Orchestrator::new(
        Preparer::new(Arc::new(CsvAnalyzer::new()), inference.clone()),
        Modeler::new(inference.clone()),
        Critic::new(inference),
        settings.orchestrator.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let (interrupt_tx, interrupt_rx) = mpsc::channel(4);
    let listener = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt_tx.send(()).await.is_err() {
                break;
            }
        }
    });

    info!(
        dataset = %dataset,
        max_retries = settings.orchestrator.max_retries,
        model = %settings.llm.model,
        "Boot sequence initiated"
    );
    let report = supervise(
        orchestrator.run(&dataset),
        orchestrator.cancellation_token(),
        interrupt_rx,
    )
    .await;
    listener.abort();
    let report = report?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&report)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
    } else {
        print_report(&report);
    }

    if let (Some(path), Some(script)) = (&args.output, report.result.script()) {
        tokio::fs::write(path, script)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write script to {}: {}", path, e))?;
        info!(path = %path, "Wrote approved script");
    }

    match report.result {
        RunResult::Approved(_) => Ok(()),
        RunResult::Failed(failure) => Err(anyhow::anyhow!(
            "No valid pipeline produced: {}",
            failure
        )),
    }
}

/// Awaits `run` while watching for interrupts.
///
/// The first interrupt cancels `token`, which the orchestrator honors at its
/// next backoff wait. A second interrupt abandons the run immediately.
async fn supervise<F, T>(
    run: F,
    token: CancellationToken,
    mut interrupts: mpsc::Receiver<()>,
) -> anyhow::Result<T>
where
    F: Future<Output = T>,
{
    tokio::pin!(run);
    let mut listening = true;

    loop {
        tokio::select! {
            output = &mut run => return Ok(output),
            signal = interrupts.recv(), if listening => match signal {
                Some(()) if !token.is_cancelled() => {
                    warn!("Interrupt received, cancelling at the next backoff wait; press Ctrl-C again to abort now");
                    token.cancel();
                }
                Some(()) => return Err(anyhow::anyhow!("Interrupted")),
                None => listening = false,
            },
        }
    }
}

fn print_report(report: &RunReport) {
    match &report.result {
        RunResult::Approved(artifact) => {
            if let Some(cleaning) = &report.cleaning_script {
                println!("\n{}\n", banner("CLEANING SCRIPT"));
                println!("{}", cleaning);
            }
            println!("\n{}\n", banner("FINAL COMPILED SCRIPT"));
            println!("{}", artifact.script);
            println!("\n{}\n", "=".repeat(BANNER_WIDTH));
            println!(
                "Algorithm: {} (attempt {} of {}, {} backoff unit(s))",
                artifact.algorithm,
                artifact.attempt + 1,
                report.attempts.len(),
                report.total_backoff_units()
            );
        }
        RunResult::Failed(failure) => {
            println!("Run {} halted: {}", report.run_id, failure);
            for attempt in &report.attempts {
                println!(
                    "  attempt {}: {}{} - {}",
                    attempt.index,
                    attempt.algorithm,
                    if attempt.leakage_flagged {
                        " [leakage flagged]"
                    } else {
                        ""
                    },
                    attempt.rationale
                );
            }
        }
    }
}

fn banner(title: &str) -> String {
    let inner = format!(" {} ", title);
    let pad = BANNER_WIDTH.saturating_sub(inner.len());
    let left = pad / 2;
    format!("{}{}{}", "=".repeat(left), inner, "=".repeat(pad - left))
}

async fn run_summarize_command(args: SummarizeArgs) -> anyhow::Result<()> {
    let dataset = DatasetReference::new(&args.dataset);
    let summary = CsvAnalyzer::new()
        .summarize(&dataset)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to summarize dataset: {}", e))?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&summary)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
    } else {
        print_summary(&dataset, &summary);
    }
    Ok(())
}

fn print_summary(dataset: &DatasetReference, summary: &DataSummary) {
    println!("Dataset: {}", dataset);
    println!(
        "Shape:   {} rows x {} columns ({} missing cells)",
        summary.shape.rows,
        summary.shape.columns,
        summary.total_missing()
    );
    println!();
    for column in &summary.columns {
        let dtype = summary.dtypes.get(column).map(String::as_str).unwrap_or("?");
        let missing = summary.missing_values.get(column).copied().unwrap_or(0);
        match summary.numerical_stats.get(column) {
            Some(stats) => println!(
                "  {:<24} {:<8} missing={:<6} mean={:.3} min={} max={}",
                column, dtype, missing, stats.mean, stats.min, stats.max
            ),
            None => println!("  {:<24} {:<8} missing={}", column, dtype, missing),
        }
    }
}
