//! Structured logging configuration for Centre

use crate::Result;
use anyhow::{anyhow, Context};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration for Centre
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,
    /// Log format (json, pretty, compact)
    pub format: LogFormat,
    /// Output destination (stdout, file, both)
    pub output: LogOutput,
    /// File path for file output
    pub file_path: Option<PathBuf>,
    /// Include source file and line numbers
    pub include_source: bool,
    /// Trace every window move
    pub performance_tracing: bool,
}

/// Log levels supported by Centre
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Log output destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            _ => Err(format!("Invalid log output: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            include_source: false,
            performance_tracing: false,
        }
    }
}

impl LogConfig {
    /// Configuration for the menu bar app, which has no terminal attached
    pub fn menu_bar() -> Self {
        Self {
            output: LogOutput::File,
            file_path: default_log_file(),
            ..Self::default()
        }
    }

    /// Load configuration from `CENTRE_LOG_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `CENTRE_LOG_*` values from `lookup` on top of `self`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = lookup("CENTRE_LOG_LEVEL").and_then(|v| v.parse().ok()) {
            self.level = level;
        }

        if let Some(format) = lookup("CENTRE_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.format = format;
        }

        if let Some(output) = lookup("CENTRE_LOG_OUTPUT").and_then(|v| v.parse().ok()) {
            self.output = output;
        }

        if let Some(file_path) = lookup("CENTRE_LOG_FILE") {
            self.file_path = Some(PathBuf::from(file_path));
        }

        if let Some(include_source) = lookup("CENTRE_LOG_SOURCE") {
            self.include_source = include_source.eq_ignore_ascii_case("true");
        }

        if let Some(performance) = lookup("CENTRE_LOG_PERFORMANCE") {
            self.performance_tracing = performance.eq_ignore_ascii_case("true");
        }

        if self.output != LogOutput::Stdout && self.file_path.is_none() {
            self.file_path = default_log_file();
        }

        self
    }

    /// Raise the level to at least `debug`
    pub fn verbose(mut self) -> Self {
        self.level = self.level.min(LogLevel::Debug);
        self
    }

    /// Filter directives used when `RUST_LOG` is not set
    pub fn filter_directives(&self) -> String {
        let mut directives = format!("centre={}", self.level.as_str());
        if self.performance_tracing {
            directives.push_str(",centre::services::centring=trace");
        }
        directives
    }
}

/// `~/Library/Logs/Centre/centre.log`
pub fn default_log_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library").join("Logs").join("Centre").join("centre.log"))
}

/// Initialize the global tracing subscriber with the given configuration
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = create_filter(config);

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if matches!(config.output, LogOutput::Stdout | LogOutput::Both) {
        layers.push(create_stdout_layer(config));
    }
    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        let file_path = config
            .file_path
            .as_ref()
            .ok_or_else(|| anyhow!("File path required for file output"))?;
        layers.push(create_file_layer(config, file_path)?);
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!(?config, "Logging initialized");
    Ok(())
}

/// Create an environment filter; `RUST_LOG` takes precedence
fn create_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter_directives()))
}

fn create_stdout_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    }
}

fn create_file_layer(config: &LogConfig, file_path: &PathBuf) -> Result<BoxedLayer> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .with_context(|| format!("Failed to open log file {}", file_path.display()))?;

    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    Ok(match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    })
}

/// Time a block and log its duration
#[macro_export]
macro_rules! trace_performance {
    ($name:expr, $block:block) => {{
        let span = tracing::info_span!("performance", operation = $name);
        let _enter = span.enter();
        let start = std::time::Instant::now();

        let result = $block;

        tracing::debug!(
            operation = $name,
            duration_us = start.elapsed().as_micros() as u64,
            "Performance trace"
        );

        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("PRETTY").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_output_parsing() {
        assert_eq!(LogOutput::from_str("Both").unwrap(), LogOutput::Both);
        assert_eq!(LogOutput::from_str("file").unwrap(), LogOutput::File);
        assert_eq!(
            LogOutput::from_str("syslog").unwrap_err(),
            "Invalid log output: syslog"
        );
    }

    #[test]
    fn overrides_apply_centre_variables() {
        let config = LogConfig::default().with_overrides(lookup(&[
            ("CENTRE_LOG_LEVEL", "trace"),
            ("CENTRE_LOG_FORMAT", "json"),
            ("CENTRE_LOG_OUTPUT", "both"),
            ("CENTRE_LOG_FILE", "/tmp/centre-test.log"),
            ("CENTRE_LOG_SOURCE", "TRUE"),
        ]));

        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/centre-test.log")));
        assert!(config.include_source);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = LogConfig::default().with_overrides(lookup(&[
            ("CENTRE_LOG_LEVEL", "loud"),
            ("CENTRE_LOG_OUTPUT", "printer"),
        ]));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn file_output_falls_back_to_default_path() {
        let config = LogConfig::default().with_overrides(lookup(&[("CENTRE_LOG_OUTPUT", "file")]));
        assert_eq!(config.file_path, default_log_file());
    }

    #[test]
    fn verbose_never_lowers_detail() {
        assert_eq!(LogConfig::default().verbose().level, LogLevel::Debug);

        let trace = LogConfig {
            level: LogLevel::Trace,
            ..LogConfig::default()
        };
        assert_eq!(trace.verbose().level, LogLevel::Trace);
    }

    #[test]
    fn filter_targets_the_crate() {
        let mut config = LogConfig::default();
        assert_eq!(config.filter_directives(), "centre=info");

        config.performance_tracing = true;
        assert!(config
            .filter_directives()
            .contains("centre::services::centring=trace"));
    }

    #[test]
    fn test_performance_macro() {
        let result = crate::trace_performance!("test_operation", { 21 * 2 });
        assert_eq!(result, 42);
    }
}
