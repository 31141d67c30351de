//! Logging configuration and initialization.
//!
//! Logs always go to stderr; stdout belongs to the transcript. The filter is
//! built from a preset plus per-target overrides, unless `RUST_LOG` is set.

use std::collections::BTreeMap;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const TARGET_ROOT: &str = "agentline";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Session lifecycle and failures only
    #[default]
    Production,
    /// Adds backend calls and stream lifecycle
    Verbose,
    /// Everything except per-chunk tracing
    Debug,
    /// Everything, including skipped frames and stale chunks
    Trace,
    /// Warnings and errors only
    Quiet,
}

impl LogPreset {
    fn directives(self) -> Vec<&'static str> {
        match self {
            LogPreset::Production => vec![
                "agentline=warn",
                "agentline::startup=info",
                "agentline::session=info",
                "agentline::cli=info",
            ],
            LogPreset::Verbose => vec!["agentline=info", "agentline::backend=debug"],
            LogPreset::Debug => vec!["agentline=debug", "reqwest=info"],
            LogPreset::Trace => vec!["agentline=trace", "reqwest=debug", "hyper_util=debug"],
            LogPreset::Quiet => vec!["agentline=warn", "reqwest=error"],
        }
    }
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Full target -> level, applied after the preset
    pub overrides: BTreeMap<String, Level>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Quiet wins over trace, trace over debug, debug over verbose.
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: &[String],
        format: LogFormat,
    ) -> Self {
        let preset = if quiet {
            LogPreset::Quiet
        } else if trace {
            LogPreset::Trace
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };

        Self {
            preset,
            overrides: parse_overrides(log_overrides),
            format,
        }
    }

    /// Filter directives in application order.
    pub fn directives(&self) -> Vec<String> {
        self.preset
            .directives()
            .into_iter()
            .map(str::to_string)
            .chain(
                self.overrides
                    .iter()
                    .map(|(target, level)| format!("{}={}", target, level_name(*level))),
            )
            .collect()
    }

    /// `RUST_LOG` if set, otherwise the preset plus overrides.
    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }

        EnvFilter::try_new(self.directives().join(","))
            .unwrap_or_else(|_| EnvFilter::new("agentline=warn"))
    }
}

/// Parse `target=level` pairs, comma separated or repeated.
///
/// Bare targets are placed under `agentline::`; `reqwest`/`hyper*` targets
/// and already-qualified ones are kept. Unknown levels are skipped.
fn parse_overrides(raw: &[String]) -> BTreeMap<String, Level> {
    raw.iter()
        .flat_map(|entry| entry.split(','))
        .filter_map(|part| {
            let (target, level) = part.split_once('=')?;
            let target = target.trim();
            let level = level.trim().parse::<Level>().ok()?;
            Some((qualify_target(target), level))
        })
        .collect()
}

fn qualify_target(target: &str) -> String {
    let external = target.starts_with("reqwest") || target.starts_with("hyper");
    if target == TARGET_ROOT || target.starts_with("agentline::") || external {
        target.to_string()
    } else {
        format!("{}::{}", TARGET_ROOT, target)
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(config.build_filter());

    match config.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .without_time(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?,
    }

    Ok(())
}
