// Logging for ddprov
//
// Everything the provisioners do, and everything that goes wrong, is
// emitted through `tracing`; the host forwards it to the build console.
// Hosts with their own global subscriber skip `init_logging` entirely and
// just add a `ddprov` directive to their filter.
use std::io::{self, IsTerminal};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ProvisionError, Result};

/// Logging configuration for standalone hosts
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format (pretty for terminals, json for programmatic use)
    pub format: LogFormat,
    /// Color output configuration
    pub color: ColorConfig,
    /// Whether to show targets (module names)
    pub show_targets: bool,
}

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

/// Color output configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ColorConfig {
    Auto,
    Always,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            color: ColorConfig::Auto,
            show_targets: false,
        }
    }
}

impl LogConfig {
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::new(format!("ddprov={}", self.level))
    }

    /// Check if colors should be used based on configuration and terminal
    pub fn should_use_colors(&self) -> bool {
        match self.color {
            ColorConfig::Always => true,
            ColorConfig::Never => false,
            ColorConfig::Auto => {
                if std::env::var_os("NO_COLOR").is_some() {
                    return false;
                }
                let term_is_dumb = std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false);
                io::stderr().is_terminal() && !term_is_dumb
            }
        }
    }
}

/// Install a global subscriber for the given configuration.
///
/// Fails when another subscriber is already installed; embedded hosts hit
/// this deliberately and should configure their own filter instead.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let already_set = |e| {
        ProvisionError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("global tracing subscriber already installed: {e}"),
        ))
    };

    match config.format {
        LogFormat::Pretty => fmt()
            .with_env_filter(config.env_filter())
            .with_target(config.show_targets)
            .with_ansi(config.should_use_colors())
            .try_init()
            .map_err(already_set),
        LogFormat::Json => fmt()
            .with_env_filter(config.env_filter())
            .json()
            .try_init()
            .map_err(already_set),
        LogFormat::Compact => fmt()
            .with_env_filter(config.env_filter())
            .compact()
            .with_target(config.show_targets)
            .try_init()
            .map_err(already_set),
    }
}

/// Logging utilities for common operations
pub mod utils {
    use tracing::{span, Level, Span};

    use crate::core::TracedLanguage;

    /// Create a span covering one coordinator invocation
    pub fn provisioning_span(run_id: &str, node_hostname: &str) -> Span {
        span!(Level::INFO, "provisioning", run_id = %run_id, node = %node_hostname)
    }

    /// Create a span covering one language provisioner
    pub fn language_span(language: TracedLanguage) -> Span {
        span!(Level::INFO, "language_provisioning", language = %language)
    }

    /// Create a span covering one external command
    pub fn command_span(command: &str) -> Span {
        span!(Level::DEBUG, "command", command = %command)
    }
}
