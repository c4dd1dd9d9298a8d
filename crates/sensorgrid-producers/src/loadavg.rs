//! System load averages read from `/proc/loadavg`.
//!
//! The file is read asynchronously right before each scrape. On hosts where
//! it does not exist the series stay NaN and never appear in the output.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use sensorgrid_metrics::{BoxError, MetricRegistry, Series, Tag};

use crate::{ProducerDescriptor, ProducerResult, parse_options};

pub const DESCRIPTOR: ProducerDescriptor = ProducerDescriptor {
    kind: "loadavg",
    description: "1, 5 and 15 minute load averages",
    build,
};

pub const METRIC: &str = "sensord_load_average";

const WINDOWS: [&str; 3] = ["1m", "5m", "15m"];

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoadavgOptions {
    path: PathBuf,
}

impl Default for LoadavgOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/loadavg"),
        }
    }
}

fn build(registry: &MetricRegistry, options: &toml::Table) -> ProducerResult<()> {
    let options: LoadavgOptions = parse_options(DESCRIPTOR.kind, options)?;

    let metric = registry.create_metric_sorted_by(METRIC, "window");
    let series: Arc<[Series; 3]> = Arc::new(WINDOWS.map(|window| metric.create([Tag::new("window", window)])));
    let path: Arc<Path> = options.path.into();

    registry.add_before_collect_async(move |_cancel| {
        let series = series.clone();
        let path = path.clone();
        async move { refresh(&path, &series).await }
    });
    Ok(())
}

async fn refresh(path: &Path, series: &[Series; 3]) -> Result<(), BoxError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "load average source missing");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let averages = parse_loadavg(&content)
        .ok_or_else(|| format!("unrecognized load average format in {}", path.display()))?;
    for (series, value) in series.iter().zip(averages) {
        series.set(value);
    }
    Ok(())
}

/// Parse the three leading fields of `/proc/loadavg`.
fn parse_loadavg(content: &str) -> Option<[f64; 3]> {
    let mut fields = content.split_whitespace().map(|f| f.parse::<f64>().ok());
    Some([fields.next()??, fields.next()??, fields.next()??])
}
