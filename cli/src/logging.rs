use anyhow::{Context, Result};
use flexi_logger::{Logger, LoggerHandle};

/// Starts stderr logging. The handle must be kept alive for the whole run.
pub fn init(level: &str) -> Result<LoggerHandle> {
    let handle = Logger::try_with_str(level)
        .with_context(|| format!("Invalid log level '{level}'"))?
        .log_to_stderr()
        .format_for_stderr(flexi_logger::default_format)
        .start()
        .context("Failed to start logger")?;
    log::debug!(
        "event=app_start module=cli platform={} version={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}
