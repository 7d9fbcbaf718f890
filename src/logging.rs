//! Logging bootstrap for the `pt` binary.
//!
//! Diagnostics go to stderr so that `--json` output on stdout stays clean.
//! Messages use the `event=<name> status=<ok|error> key=value` shape.
//! `RUST_LOG` overrides the configured level.

use std::sync::OnceLock;

use flexi_logger::{Logger, LoggerHandle};
use log::debug;

static LOGGER: OnceLock<LoggerHandle> = OnceLock::new();

/// Level used before a config has been read, or when it has none
pub const DEFAULT_LEVEL: &str = "warn";

/// Start the logger once per process. Later calls are ignored.
///
/// Failures are reported on stderr and never stop the command.
pub fn init_logging(level: &str) {
    if LOGGER.get().is_some() {
        return;
    }
    let level = match normalize_level(level) {
        Ok(level) => level,
        Err(msg) => {
            eprintln!("warning: {}", msg);
            DEFAULT_LEVEL
        }
    };
    let started = Logger::try_with_env_or_str(level).and_then(|logger| {
        logger
            .log_to_stderr()
            .format(flexi_logger::default_format)
            .start()
    });
    match started {
        Ok(handle) => {
            let _ = LOGGER.set(handle);
            debug!(
                "event=logging_init status=ok level={} version={}",
                level,
                env!("CARGO_PKG_VERSION")
            );
        }
        Err(e) => eprintln!("warning: could not start logger: {}", e),
    }
}

/// Map a configured level onto one flexi_logger accepts.
pub fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected off|trace|debug|info|warn|error"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(" WARNING "), Ok("warn"));
        assert_eq!(normalize_level("debug"), Ok("debug"));
        assert!(normalize_level("loud").is_err());
    }
}
