//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use clap::{Args, Parser, ValueEnum};
use ollama_rs::Ollama;
use tracing::info;

use crate::classifier::FixedDelay;
use crate::prompt::DEFAULT_TOPIC;
use crate::rss::{is_valid_url, DEFAULT_FEED_URL, DEFAULT_USER_AGENT, REQUEST_TIMEOUT};
use crate::{LLMClient, LLMParams};

const DEFAULT_OLLAMA_PORT: u16 = 11434;
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    Openai,
    Ollama,
}

/// Options shared by every binary that talks to a model.
#[derive(Debug, Clone, Args)]
pub struct LlmArgs {
    /// Which text-completion service to use
    #[arg(long, env = "LLM_PROVIDER", value_enum, default_value = "openai")]
    pub llm_provider: LlmProvider,

    /// Model name; defaults to gpt-4o-mini for openai and is required for ollama
    #[arg(long, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.0)]
    pub temperature: f32,

    /// OpenAI API key, required with the openai provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Ollama base URL, e.g. http://localhost:11434
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    pub ollama_host: String,

    /// Per-call timeout for the model, in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 120)]
    pub llm_timeout_secs: u64,

    /// Pause after every model call, in milliseconds
    #[arg(long, env = "REQUEST_DELAY_MS", default_value_t = 500)]
    pub request_delay_ms: u64,

    /// Directory for the rolling log file
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

impl LlmArgs {
    /// The configured model, or the provider's default when there is one.
    pub fn model_name(&self) -> Result<String> {
        match (self.model.as_deref().map(str::trim), self.llm_provider) {
            (Some(model), _) if !model.is_empty() => Ok(model.to_string()),
            (_, LlmProvider::Openai) => Ok(DEFAULT_OPENAI_MODEL.to_string()),
            (_, LlmProvider::Ollama) => bail!("LLM_MODEL must be set when using the ollama provider"),
        }
    }

    /// Build the model client; it is created once per run and passed down.
    pub fn llm_params(&self) -> Result<LLMParams> {
        let model = self.model_name()?;
        let llm_client = match self.llm_provider {
            LlmProvider::Openai => {
                let api_key = self
                    .openai_api_key
                    .as_deref()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set when using the openai provider"))?;
                let config = OpenAIConfig::new().with_api_key(api_key);
                info!("Using OpenAI model {}", model);
                LLMClient::OpenAI(OpenAIClient::with_config(config))
            }
            LlmProvider::Ollama => {
                let (host, port) = parse_ollama_host(&self.ollama_host)?;
                info!("Connecting to Ollama at {}:{} with model {}", host, port, model);
                LLMClient::Ollama(Ollama::new(host, port))
            }
        };

        Ok(LLMParams {
            llm_client,
            model,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.llm_timeout_secs),
        })
    }

    pub fn delay(&self) -> FixedDelay {
        FixedDelay(Duration::from_millis(self.request_delay_ms))
    }
}

/// Split an Ollama base URL into the scheme+host and port `Ollama::new` expects.
pub fn parse_ollama_host(host_url: &str) -> Result<(String, u16)> {
    let url = url::Url::parse(host_url).with_context(|| format!("Invalid OLLAMA_HOST: {}", host_url))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Missing host in OLLAMA_HOST: {}", host_url))?;
    let port = url.port().unwrap_or(DEFAULT_OLLAMA_PORT);
    Ok((format!("{}://{}", url.scheme(), host), port))
}

/// Filter a PubMed feed into relevant and rejected RSS feeds.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct FilterConfig {
    /// Source RSS/Atom feed URL
    #[arg(long, env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Directory receiving filtered_feed.xml and rejected_feed.xml
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Topic the classifier filters for
    #[arg(long, env = "TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Upper bound on the paper text sent to the model, in characters
    #[arg(long, env = "MAX_PROMPT_CHARS", default_value_t = 4000)]
    pub max_prompt_chars: usize,

    /// Feed request timeout, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = REQUEST_TIMEOUT.as_secs())]
    pub fetch_timeout_secs: u64,

    /// User-Agent sent with the feed request
    #[arg(long, env = "FEED_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Fail the run when more than this share (0.0-1.0) of classifications fall back
    #[arg(long, env = "MAX_FALLBACK_RATIO")]
    pub max_fallback_ratio: Option<f64>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_url(&self.feed_url) {
            bail!("FEED_URL is not a valid http(s) URL: {}", self.feed_url);
        }
        if let Some(ratio) = self.max_fallback_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                bail!("MAX_FALLBACK_RATIO must be between 0.0 and 1.0, got {}", ratio);
            }
        }
        if self.max_prompt_chars == 0 {
            bail!("MAX_PROMPT_CHARS must be greater than zero");
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
