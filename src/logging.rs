//! Logging setup for the client binaries
//!
//! The library itself only emits `tracing` events; binaries (and embedding
//! applications that want the same defaults) initialize a subscriber here.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level when `RUST_LOG` is unset
    pub level: Level,

    /// Log to stderr, keeping stdout for program output
    pub stderr: bool,

    /// Include event targets (module paths)
    pub targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            stderr: true,
            targets: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            if rust_log.contains("trace") {
                config.level = Level::TRACE;
            } else if rust_log.contains("debug") {
                config.level = Level::DEBUG;
            } else if rust_log.contains("info") {
                config.level = Level::INFO;
            } else if rust_log.contains("warn") {
                config.level = Level::WARN;
            } else if rust_log.contains("error") {
                config.level = Level::ERROR;
            }
        }

        if let Ok(stderr) = std::env::var("AGUA_IOT_LOG_STDERR") {
            config.stderr = stderr.to_lowercase() != "false";
        }

        config
    }
}

/// Initialize logging with the given configuration
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.targets);

    if config.stderr {
        builder.with_writer(std::io::stderr).try_init()?;
    } else {
        builder.try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.stderr);
        assert!(!config.targets);
    }

    fn require_send_sync<T: Send + Sync>(_: &T) {}

    #[test]
    fn test_second_init_rejected() {
        assert!(init_logging(LogConfig::default()).is_ok());

        let err = init_logging(LogConfig {
            stderr: false,
            ..LogConfig::default()
        })
        .expect_err("a second global subscriber must be rejected");
        require_send_sync(&err);
        assert!(!err.to_string().is_empty());
    }
}
