use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use pubmed_filter::best_of::{self, BestOfOptions, LlmScorer, DEFAULT_TOP_N};
use pubmed_filter::config::LlmArgs;
use pubmed_filter::logging::configure_logging;

/// Pick the most impactful papers from the filtered feed.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Filtered feed produced by pubmed-filter
    #[arg(long, env = "BEST_OF_INPUT", default_value = "output/filtered_feed.xml")]
    input: PathBuf,

    /// Where to write the best-of feed
    #[arg(long, env = "BEST_OF_OUTPUT", default_value = "best_of/best_of_feed.xml")]
    output: PathBuf,

    /// Plain-text selection criteria placed at the top of every scoring prompt
    #[arg(long, env = "BEST_OF_CRITERIA", default_value = "best_of/best_of_instructions.txt")]
    criteria: PathBuf,

    /// Number of papers to keep
    #[arg(long, env = "BEST_OF_TOP_N", default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Sampling temperature used for scoring
    #[arg(long, env = "BEST_OF_TEMPERATURE", default_value_t = 0.3)]
    score_temperature: f32,

    #[command(flatten)]
    llm: LlmArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    configure_logging(&args.llm.log_dir, "select_best.log");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let criteria = best_of::load_criteria(&args.criteria).await?;

    let mut params = args.llm.llm_params().context("Failed to configure the model client")?;
    params.temperature = args.score_temperature;
    let scorer = LlmScorer::new(params, criteria);

    let options = BestOfOptions {
        input: args.input,
        output: args.output,
        top_n: args.top_n,
    };
    match best_of::select_best(&options, &scorer, &args.llm.delay(), Utc::now()).await? {
        Some(best) => info!("Selected top {} papers into {}", best.len(), options.output.display()),
        None => info!("Nothing to select; {} left untouched", options.output.display()),
    }
    Ok(())
}
