//! Summarize a research paper into a verified four-paragraph lay summary.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable. Logs go
//! to stderr (`RUST_LOG` overrides the default `info` level); the summary
//! goes to stdout.
//!
//! # Examples
//!
//! ```sh
//! # Summarize a plaintext paper
//! paperdigest summarize paper.txt
//!
//! # From stdin, with a separate verifier model and a five-minute cap
//! pdftotext paper.pdf - | paperdigest summarize - \
//!   --verifier-model anthropic/claude-3.5-haiku --timeout-secs 300
//!
//! # Explain the jargon in a snippet
//! paperdigest define "We fine-tune a transformer with LoRA adapters."
//! ```
//!
//! Exit codes: 0 when a summary is accepted, 2 when every attempt was
//! rejected (the fallback message is printed instead), 1 on errors.

use clap::{Args, Parser, Subcommand};
use paperdigest::api::{Backoff, ModelConfig, RetryPolicy};
use paperdigest::error::DigestError;
use paperdigest::pipeline::{LoggingHandler, PipelineConfig, SummaryOutcome, SummaryPipeline};
use paperdigest::{DEFAULT_MODEL, OpenRouterClient};
use std::io::{self, Read};
use std::process;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "paperdigest", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a plaintext paper (use `-` for stdin)
    Summarize {
        /// Path to the paper's plaintext, or `-` to read stdin
        input: String,

        #[command(flatten)]
        opts: SummarizeOpts,
    },
    /// Define the key technical term in a snippet of text
    Define {
        /// Text containing the jargon to explain
        text: String,

        /// Model for the definition
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },
}

#[derive(Args)]
struct SummarizeOpts {
    // ── Models ─────────────────────────────────────────────────
    /// Model for condensing and generating
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Model for both verifiers (defaults to --model)
    #[arg(long)]
    verifier_model: Option<String>,

    // ── Budgets ────────────────────────────────────────────────
    /// Generate-then-verify cycles before giving up
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Papers above this many tokens are condensed first
    #[arg(long, default_value_t = 30_000)]
    token_budget: usize,

    /// Maximum tokens per chunk when condensing
    #[arg(long, default_value_t = 7_000)]
    chunk_token_budget: usize,

    /// Chunk summaries in flight at once
    #[arg(long, default_value_t = 4)]
    map_concurrency: usize,

    /// Overall deadline for the run, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    // ── Retries ────────────────────────────────────────────────
    /// Delay between retries of a failed model call, in seconds
    #[arg(long, default_value_t = 40)]
    retry_delay_secs: u64,

    /// Retries per model call before giving up (no count limit if unset)
    #[arg(long)]
    max_call_retries: Option<u32>,

    /// Time spent retrying one model call before giving up, in seconds
    /// (0 retries without a time limit)
    #[arg(long, default_value_t = 1800)]
    max_call_secs: u64,
}

impl SummarizeOpts {
    fn pipeline_config(&self) -> PipelineConfig {
        let generation = ModelConfig::generation().with_model(&self.model);
        let verification = ModelConfig::verification()
            .with_model(self.verifier_model.as_deref().unwrap_or(&self.model));
        let retry = RetryPolicy::default()
            .with_backoff(Backoff::Fixed(Duration::from_secs(self.retry_delay_secs)))
            .with_max_retries(self.max_call_retries)
            .with_max_elapsed((self.max_call_secs > 0).then(|| Duration::from_secs(self.max_call_secs)));

        PipelineConfig::default()
            .with_generation(generation)
            .with_verification(verification)
            .with_max_attempts(self.max_attempts)
            .with_token_budget(self.token_budget)
            .with_chunk_token_budget(self.chunk_token_budget)
            .with_map_concurrency(self.map_concurrency)
            .with_retry(retry)
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(input: &str) -> Result<String, DigestError> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| DigestError::InvalidInput(format!("failed to read stdin: {e}")))?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| DigestError::InvalidInput(format!("failed to read {input}: {e}")))
    }
}

fn client() -> Result<OpenRouterClient, DigestError> {
    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| DigestError::Configuration("OPENROUTER_KEY is not set".into()))?;
    OpenRouterClient::new(api_key)
}

/// Returns the text to print and the exit code.
async fn run(cli: Cli) -> Result<(String, i32), DigestError> {
    match cli.command {
        Command::Summarize { input, opts } => {
            let paper = read_input(&input)?;
            let client = client()?;
            let pipeline =
                SummaryPipeline::new(&client, opts.pipeline_config())?.with_event_handler(&LoggingHandler);

            let outcome = match opts.timeout_secs {
                Some(secs) => {
                    pipeline
                        .summarize_with_deadline(&paper, Duration::from_secs(secs))
                        .await?
                }
                None => pipeline.summarize_and_verify(&paper).await?,
            };
            let code = match outcome {
                SummaryOutcome::Accepted { .. } => 0,
                SummaryOutcome::Exhausted { .. } => 2,
            };
            Ok((outcome.text_or_sentinel().to_string(), code))
        }
        Command::Define { text, model } => {
            let client = client()?;
            let config =
                PipelineConfig::default().with_generation(ModelConfig::generation().with_model(model));
            let pipeline = SummaryPipeline::new(&client, config)?.with_event_handler(&LoggingHandler);
            let definition = pipeline.define_unclear_terms(&text).await?;
            Ok((definition, 0))
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok((text, code)) => {
            println!("{text}");
            if code != 0 {
                process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize_opts(args: &[&str]) -> SummarizeOpts {
        let argv = ["paperdigest", "summarize", "paper.txt"].iter().chain(args).copied();
        match Cli::parse_from(argv).command {
            Command::Summarize { opts, .. } => opts,
            Command::Define { .. } => panic!("expected summarize"),
        }
    }

    #[test]
    fn default_retries_are_capped_by_time_only() {
        let retry = summarize_opts(&[]).pipeline_config().retry;
        assert_eq!(retry.max_retries, None);
        assert_eq!(retry.max_elapsed, Some(Duration::from_secs(1800)));
        assert_eq!(retry.backoff, Backoff::Fixed(Duration::from_secs(40)));
    }

    #[test]
    fn zero_call_secs_retries_without_time_limit() {
        let retry = summarize_opts(&["--max-call-secs", "0"]).pipeline_config().retry;
        assert_eq!(retry.max_retries, None);
        assert_eq!(retry.max_elapsed, None);
    }

    #[test]
    fn retry_flags_map_onto_policy() {
        let retry = summarize_opts(&["--max-call-retries", "5", "--max-call-secs", "60"])
            .pipeline_config()
            .retry;
        assert_eq!(retry.max_retries, Some(5));
        assert_eq!(retry.max_elapsed, Some(Duration::from_secs(60)));
    }

    #[test]
    fn verifier_model_defaults_to_model() {
        let config = summarize_opts(&["--model", "openai/gpt-4o-mini"]).pipeline_config();
        assert_eq!(config.verification.model, "openai/gpt-4o-mini");
        assert_eq!(config.generation.model, "openai/gpt-4o-mini");
    }
}
