use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use pubmed_filter::classifier::LlmClassifier;
use pubmed_filter::config::FilterConfig;
use pubmed_filter::logging::configure_logging;
use pubmed_filter::pipeline::{self, RunOptions, RunSummary};
use pubmed_filter::rss::HttpFeedSource;

#[tokio::main]
async fn main() -> ExitCode {
    let config = FilterConfig::parse();
    configure_logging(&config.llm.log_dir, "pubmed_filter.log");

    match run(config).await {
        Ok(summary) => {
            info!("Completed: {}", summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: FilterConfig) -> Result<RunSummary> {
    config.validate()?;

    let source = HttpFeedSource::new(&config.feed_url, &config.user_agent, config.fetch_timeout())?;
    let params = config.llm.llm_params().context("Failed to configure the model client")?;
    let classifier = LlmClassifier::new(params, &config.topic, config.max_prompt_chars);
    let delay = config.llm.delay();

    let mut options = RunOptions::new(&config.output_dir);
    options.max_fallback_ratio = config.max_fallback_ratio;

    info!("Filtering {} into {}", config.feed_url, config.output_dir.display());
    let summary = pipeline::run(&source, &classifier, &delay, &options).await?;
    Ok(summary)
}
