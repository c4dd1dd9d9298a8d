//! sensorgrid-core — shared configuration for the SensorGrid exporter.

pub mod config;

pub use config::{
    ConfigError, ConfigResult, ExporterConfig, LogFormat, LoggingConfig, ProducerConfig,
    SensordConfig, is_valid_name, parse_duration,
};
