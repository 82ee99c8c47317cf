// depgate-common/src/logging.rs
use std::fs;

use tracing::debug;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::Result;

/// Installs the global subscriber. Returns `Ok(false)` if one was already installed.
pub fn init(config: &Config) -> Result<bool> {
    let env_filter = EnvFilter::builder()
        .parse_lossy(&config.log_filter);

    let installed = match config.log_dir() {
        Some(log_dir) => {
            fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "depgate.log");
            let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

            let installed = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr.and(non_blocking_appender))
                .with_ansi(config.ansi)
                .without_time()
                .try_init()
                .is_ok();

            if installed {
                Box::leak(Box::new(guard)); // Keep guard alive
                debug!("Writing logs to: {}/depgate.log", log_dir.display());
            }
            installed
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .without_time()
            .try_init()
            .is_ok(),
    };

    Ok(installed)
}
