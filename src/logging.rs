use std::io;
use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const STDOUT_DIRECTIVES: &str = "info,llm_request=info,web_request=info,feed_write=info,hyper=warn,reqwest=warn";
const FILE_DIRECTIVES: &str = "info,llm_request=debug,web_request=debug,feed_write=debug,hyper=warn";

/// Log to stdout and to a daily-rotated file under `log_dir`.
///
/// `RUST_LOG`, when set, replaces the stdout directives.
pub fn configure_logging(log_dir: &Path, file_name: &str) {
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDOUT_DIRECTIVES));

    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter);

    let file_appender = rolling::daily(log_dir, file_name);
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new(FILE_DIRECTIVES));

    let _ = tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .try_init();
}
