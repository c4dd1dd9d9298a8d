//! sensorgrid-producers — data sources that feed the metric registry.
//!
//! Producers are selected by `kind` from a static descriptor table; there is
//! no runtime discovery. Each descriptor's `build` function registers the
//! producer's metrics and refresh callbacks on the registry it is given.

pub mod error;
pub mod loadavg;
pub mod process;
pub mod static_gauge;

use serde::de::DeserializeOwned;
use tracing::info;

use sensorgrid_core::{ProducerConfig, is_valid_name};
use sensorgrid_metrics::MetricRegistry;

pub use error::{ProducerError, ProducerResult};

/// Builds one producer from its config options.
pub type BuildFn = fn(&MetricRegistry, &toml::Table) -> ProducerResult<()>;

/// Entry in the producer table.
#[derive(Debug, Clone, Copy)]
pub struct ProducerDescriptor {
    pub kind: &'static str,
    pub description: &'static str,
    pub build: BuildFn,
}

/// Every producer `sensord` can run.
pub const PRODUCERS: &[ProducerDescriptor] = &[
    static_gauge::DESCRIPTOR,
    process::DESCRIPTOR,
    loadavg::DESCRIPTOR,
];

/// Look up a producer by kind.
pub fn find(kind: &str) -> Option<&'static ProducerDescriptor> {
    PRODUCERS.iter().find(|d| d.kind == kind)
}

/// Build the producer described by `config`.
pub fn install(registry: &MetricRegistry, config: &ProducerConfig) -> ProducerResult<()> {
    let descriptor =
        find(&config.kind).ok_or_else(|| ProducerError::UnknownKind(config.kind.clone()))?;
    (descriptor.build)(registry, &config.options)?;
    info!(kind = descriptor.kind, "producer installed");
    Ok(())
}

/// Build every configured producer, stopping at the first failure.
pub fn install_all(registry: &MetricRegistry, configs: &[ProducerConfig]) -> ProducerResult<usize> {
    for config in configs {
        install(registry, config)?;
    }
    Ok(configs.len())
}

/// Deserialize a producer's options table.
pub(crate) fn parse_options<T: DeserializeOwned>(
    kind: &'static str,
    options: &toml::Table,
) -> ProducerResult<T> {
    toml::Value::Table(options.clone())
        .try_into()
        .map_err(|source| ProducerError::Options { kind, source })
}

pub(crate) fn check_name(what: &'static str, name: &str) -> ProducerResult<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ProducerError::InvalidName {
            what,
            name: name.to_string(),
        })
    }
}
