//! Command-line surface: `annotate`, `estimate` and `merge`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config;
use crate::corpus::{merge_text_files, read_sentences};
use crate::pipeline::annotation::{
    load_resume_set, AnnotationConfig, AnnotationError, BatchOrchestrator, BatchStatusEvent,
    ResumeSet, RunSummary,
};
use crate::pipeline::oracle::{GeminiClient, OllamaClient, Oracle, ThreadSleeper};
use crate::time_estimation::{estimate_generation, EstimateParams};

#[derive(Parser, Debug)]
#[command(name = "cnergen", version)]
#[command(about = "Generate Burmese CNER training data with an LLM oracle")]
pub struct Cli {
    /// Debug-level logging (ignored when RUST_LOG is set)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annotate a sentence file into JSON Lines, resuming a previous run
    Annotate(AnnotateArgs),

    /// Estimate tokens, cost and time for annotating a sentence file
    Estimate(EstimateArgs),

    /// Merge every .txt file of a directory into one corpus file
    Merge {
        source_dir: PathBuf,
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Gemini,
    Ollama,
}

#[derive(clap::Args, Debug)]
pub struct AnnotateArgs {
    /// Input file, one sentence per line
    pub input: PathBuf,

    /// Output JSON Lines file (appended to)
    pub output: PathBuf,

    #[arg(long, default_value_t = 50)]
    pub batch_size: usize,

    #[arg(long, value_enum, default_value_t = Backend::Gemini)]
    pub backend: Backend,

    /// Model name (defaults per backend)
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, default_value = config::DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Maximum validate-and-repair loops per batch
    #[arg(long, default_value_t = 5)]
    pub max_loops: u32,

    #[arg(long, default_value_t = 5)]
    pub extraction_attempts: u32,

    #[arg(long, default_value_t = 3)]
    pub correction_attempts: u32,

    /// Seed for few-shot example sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Delete an existing output file instead of resuming it
    #[arg(long)]
    pub fresh: bool,
}

impl AnnotateArgs {
    pub fn annotation_config(&self) -> AnnotationConfig {
        AnnotationConfig {
            batch_size: self.batch_size,
            extraction_attempts: self.extraction_attempts,
            correction_attempts: self.correction_attempts,
            max_correction_loops: self.max_loops,
            seed: self.seed,
            ..AnnotationConfig::default()
        }
    }

    fn model_name(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(model), _) => model.as_str(),
            (None, Backend::Gemini) => config::DEFAULT_GEMINI_MODEL,
            (None, Backend::Ollama) => config::DEFAULT_OLLAMA_MODEL,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct EstimateArgs {
    pub input: PathBuf,

    #[arg(long, default_value_t = 50)]
    pub batch_size: usize,

    /// Average prompt tokens per sentence
    #[arg(long)]
    pub tokens_in: Option<u64>,

    /// Average reply tokens per sentence
    #[arg(long)]
    pub tokens_out: Option<u64>,

    /// USD per million input tokens
    #[arg(long)]
    pub price_in: Option<f64>,

    /// USD per million output tokens
    #[arg(long)]
    pub price_out: Option<f64>,

    #[arg(long)]
    pub requests_per_minute: Option<u32>,
}

impl EstimateArgs {
    pub fn params(&self) -> EstimateParams {
        let defaults = EstimateParams::default();
        EstimateParams {
            batch_size: self.batch_size,
            tokens_in_per_sentence: self.tokens_in.unwrap_or(defaults.tokens_in_per_sentence),
            tokens_out_per_sentence: self.tokens_out.unwrap_or(defaults.tokens_out_per_sentence),
            price_in_per_million: self.price_in.unwrap_or(defaults.price_in_per_million),
            price_out_per_million: self.price_out.unwrap_or(defaults.price_out_per_million),
            requests_per_minute: self.requests_per_minute.unwrap_or(defaults.requests_per_minute),
        }
    }
}

// ═══════════════════════════════════════════
// Dispatch
// ═══════════════════════════════════════════

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Annotate(args) => annotate(&args).map(|_| ()),
        Commands::Estimate(args) => estimate(&args),
        Commands::Merge { source_dir, output } => {
            let report = merge_text_files(&source_dir, &output)
                .with_context(|| format!("Failed to merge {}", source_dir.display()))?;
            println!(
                "Merged {} files ({} sentences) into {}",
                report.files,
                report.sentences,
                output.display()
            );
            Ok(())
        }
    }
}

fn annotate(args: &AnnotateArgs) -> Result<RunSummary> {
    config::load_dotenv();

    let annotation_config = args.annotation_config();
    let mut orchestrator = BatchOrchestrator::from_config(&annotation_config)?;

    if !args.input.is_file() {
        return Err(AnnotationError::InputNotFound(args.input.clone()).into());
    }

    let oracle = build_oracle(args)?;
    tracing::info!(oracle = %oracle.describe(), "Oracle ready");

    let resume = prepare_output(&args.output, args.fresh)?;

    let summary = orchestrator.run(
        oracle.as_ref(),
        &ThreadSleeper,
        &args.input,
        &args.output,
        Some(&resume),
        Some(&log_progress),
    )?;

    println!(
        "Wrote {} records in {} batches ({} skipped, {} failed batches, {} unconverged, {} resumed) to {}",
        summary.records_written,
        summary.batches_processed,
        summary.records_skipped,
        summary.failed_batches,
        summary.unconverged_batches,
        summary.resumed_sentences,
        args.output.display()
    );
    Ok(summary)
}

/// Build the selected backend and run its pre-flight check.
fn build_oracle(args: &AnnotateArgs) -> Result<Box<dyn Oracle>, AnnotationError> {
    let model = args.model_name();
    match args.backend {
        Backend::Gemini => {
            let key = config::gemini_api_key()?;
            Ok(Box::new(GeminiClient::new(key, model, config::ORACLE_TIMEOUT_SECS)?))
        }
        Backend::Ollama => {
            let client = OllamaClient::new(&args.ollama_url, model, config::ORACLE_TIMEOUT_SECS)?;
            if !client.is_model_available()? {
                return Err(AnnotationError::ModelUnavailable {
                    backend: args.ollama_url.clone(),
                    model: model.to_string(),
                });
            }
            Ok(Box::new(client))
        }
    }
}

/// Apply `--fresh`, then load whatever a previous run left behind.
fn prepare_output(output: &Path, fresh: bool) -> Result<ResumeSet, AnnotationError> {
    if fresh && output.exists() {
        std::fs::remove_file(output).map_err(|source| AnnotationError::OutputNotWritable {
            path: output.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %output.display(), "Removed existing output (--fresh)");
        return Ok(ResumeSet::default());
    }
    Ok(load_resume_set(output))
}

fn log_progress(event: BatchStatusEvent) {
    match event {
        BatchStatusEvent::Started {
            sentence_count,
            resumed_count,
            batch_count,
        } => {
            if sentence_count == 0 {
                tracing::info!(resumed_count, "Nothing to do, every sentence is already annotated");
            } else {
                tracing::info!(sentence_count, resumed_count, batch_count, "Processing sentences");
            }
        }
        BatchStatusEvent::BatchCompleted {
            batch,
            total,
            written,
            skipped,
            converged,
        } => {
            tracing::info!("Batch {batch}/{total}: wrote {written}, skipped {skipped}");
            if !converged {
                tracing::warn!(batch, "Batch written with invalid labels remaining");
            }
        }
        BatchStatusEvent::Completed { summary } => {
            tracing::debug!(summary = ?summary, "Run finished");
        }
    }
}

fn estimate(args: &EstimateArgs) -> Result<()> {
    let sentences = read_sentences(&args.input)?;
    let est = estimate_generation(sentences.len(), &args.params());

    println!("--- Annotation estimate ---");
    println!("Corpus size: {} sentences", est.sentences);
    println!(
        "Tokens: {} (input: {}, output: {})",
        est.total_tokens(),
        est.input_tokens,
        est.output_tokens
    );
    println!(
        "Cost: ${:.2} (input: ${:.2}, output: ${:.2})",
        est.total_cost(),
        est.input_cost,
        est.output_cost
    );
    println!(
        "Time: {} requests, {:.2} minutes (~{:.2} hours)",
        est.requests,
        est.minutes,
        est.hours()
    );
    Ok(())
}
