//! Logging initialization

use anyhow::{Context, Result};
use bypass_core::config::LoggingConfig;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Resolved logging options
///
/// Command-line flags win over the `[logging]` table of the service file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub directive: String,
    /// Output format
    pub format: LogFormat,
    /// Optional log file
    pub file: Option<String>,
    /// Verbosity, controls targets and source locations
    pub verbose: u8,
    level_from_flags: bool,
}

impl LogSettings {
    /// Settings implied by CLI flags alone
    pub fn from_args(args: &Args) -> Self {
        let directive = if args.quiet {
            "error"
        } else {
            match args.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };

        Self {
            directive: directive.to_string(),
            format: args.log_format,
            file: args.log_file.clone(),
            verbose: args.verbose,
            level_from_flags: args.quiet || args.verbose > 0,
        }
    }

    /// Fill in whatever the flags left at their defaults
    #[must_use]
    pub fn with_config(mut self, config: &LoggingConfig) -> Self {
        if !self.level_from_flags {
            self.directive = config.level.clone();
        }
        if self.format == LogFormat::Text && config.json_format {
            self.format = LogFormat::Json;
        }
        if self.file.is_none() {
            self.file = config.file.clone();
        }
        self
    }
}

/// Initialize the global subscriber
pub fn init(settings: &LogSettings) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.directive))
        .with_context(|| format!("Invalid log level: {}", settings.directive))?;

    let log_file = match settings.file {
        Some(ref path) => Some(Mutex::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {path}"))?,
        )),
        None => None,
    };

    match settings.format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(settings.verbose >= 2)
                        .with_thread_ids(settings.verbose >= 3)
                        .with_file(settings.verbose >= 3)
                        .with_line_number(settings.verbose >= 3),
                );

            if let Some(file) = log_file {
                let file_layer = fmt::layer().with_ansi(false).with_writer(file);
                subscriber.with(file_layer).init();
            } else {
                subscriber.init();
            }
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json());

            if let Some(file) = log_file {
                let file_layer = fmt::layer().json().with_writer(file);
                subscriber.with(file_layer).init();
            } else {
                subscriber.init();
            }
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact());

            if let Some(file) = log_file {
                let file_layer = fmt::layer().compact().with_ansi(false).with_writer(file);
                subscriber.with(file_layer).init();
            } else {
                subscriber.init();
            }
        }
    }

    Ok(())
}
