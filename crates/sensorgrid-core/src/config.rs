//! sensord.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output target meaning "write to standard output".
pub const STDOUT_OUTPUT: &str = "-";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid interval {0:?} (expected e.g. \"500ms\", \"15s\", \"2m\")")]
    Interval(String),

    #[error("exporter output must not be empty")]
    EmptyOutput,

    #[error("producer #{0} has no kind")]
    MissingKind(usize),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensordConfig {
    pub exporter: ExporterConfig,
    pub logging: LoggingConfig,
    pub producers: Vec<ProducerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// File to publish each document to, or `-` for stdout.
    pub output: String,
    /// Time between collections, e.g. `"15s"`.
    pub interval: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            output: STDOUT_OUTPUT.to_string(),
            interval: "15s".to_string(),
        }
    }
}

impl ExporterConfig {
    pub fn interval(&self) -> ConfigResult<Duration> {
        match parse_duration(&self.interval) {
            Some(d) if !d.is_zero() => Ok(d),
            _ => Err(ConfigError::Interval(self.interval.clone())),
        }
    }

    /// The output file, or `None` for stdout.
    pub fn output_path(&self) -> Option<&Path> {
        (self.output != STDOUT_OUTPUT).then(|| Path::new(&self.output))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directives, overridden by `RUST_LOG` when set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// One `[[producers]]` entry. Everything besides `kind` is handed to the
/// producer as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub kind: String,
    #[serde(flatten)]
    pub options: toml::Table,
}

impl ProducerConfig {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            options: toml::Table::new(),
        }
    }
}

impl SensordConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: SensordConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.exporter.output.trim().is_empty() {
            return Err(ConfigError::EmptyOutput);
        }
        self.exporter.interval()?;
        if let Some(index) = self.producers.iter().position(|p| p.kind.trim().is_empty()) {
            return Err(ConfigError::MissingKind(index));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A starter config that exercises every built-in producer.
    pub fn scaffold(site: &str) -> Self {
        let mut info = ProducerConfig::new("static");
        info.options.insert("metric".into(), "sensord_site_info".into());
        info.options.insert("value".into(), 1.0.into());
        let mut tags = toml::Table::new();
        tags.insert("site".into(), site.into());
        info.options.insert("tags".into(), toml::Value::Table(tags));

        SensordConfig {
            exporter: ExporterConfig::default(),
            logging: LoggingConfig::default(),
            producers: vec![info, ProducerConfig::new("process"), ProducerConfig::new("loadavg")],
        }
    }
}

/// Label and metric names: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
