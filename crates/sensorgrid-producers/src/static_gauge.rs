//! Fixed-value gauge, typically used for `*_info` style metrics.
//!
//! ```toml
//! [[producers]]
//! kind = "static"
//! metric = "sensord_site_info"
//! value = 1.0
//! tags = { site = "lab", rack = "r1" }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use sensorgrid_metrics::{MetricRegistry, Tag};

use crate::{ProducerDescriptor, ProducerResult, check_name, parse_options};

pub const DESCRIPTOR: ProducerDescriptor = ProducerDescriptor {
    kind: "static",
    description: "a single gauge with fixed tags and value",
    build,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticOptions {
    metric: String,
    value: f64,
    #[serde(default)]
    tags: BTreeMap<String, toml::Value>,
}

fn build(registry: &MetricRegistry, options: &toml::Table) -> ProducerResult<()> {
    let options: StaticOptions = parse_options(DESCRIPTOR.kind, options)?;
    check_name("metric", &options.metric)?;
    for key in options.tags.keys() {
        check_name("tag", key)?;
    }

    let tags: Vec<Tag> = options
        .tags
        .iter()
        .map(|(key, value)| match value {
            toml::Value::String(s) => Tag::new(key.as_str(), s.as_str()),
            toml::Value::Boolean(b) => Tag::new(key.as_str(), *b),
            toml::Value::Integer(i) => Tag::new(key.as_str(), *i),
            toml::Value::Float(f) => Tag::new(key.as_str(), *f),
            other => Tag::new(key.as_str(), other.to_string()),
        })
        .collect();

    let series = registry.create_metric(options.metric.as_str()).create(tags);
    series.set(options.value);
    debug!(metric = %options.metric, value = options.value, "static gauge registered");
    Ok(())
}
