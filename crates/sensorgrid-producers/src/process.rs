//! Exporter process gauges.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sensorgrid_metrics::MetricRegistry;

use crate::{ProducerDescriptor, ProducerResult};

pub const DESCRIPTOR: ProducerDescriptor = ProducerDescriptor {
    kind: "process",
    description: "exporter start time and uptime",
    build,
};

pub const START_TIME_METRIC: &str = "sensord_process_start_time_seconds";
pub const UPTIME_METRIC: &str = "sensord_process_uptime_seconds";

fn build(registry: &MetricRegistry, _options: &toml::Table) -> ProducerResult<()> {
    let started = Instant::now();
    let start_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();

    registry.create_metric(START_TIME_METRIC).create([]).set(start_time.floor());

    let uptime = registry.create_metric(UPTIME_METRIC).create([]);
    registry.add_before_collect(move || {
        uptime.set(started.elapsed().as_secs_f64());
        Ok(())
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uptime_is_refreshed_per_scrape() {
        let registry = MetricRegistry::new();
        build(&registry, &toml::Table::new()).unwrap();

        let doc = registry.render(0).await.unwrap();
        assert!(doc.contains(&format!("# TYPE {START_TIME_METRIC} gauge\n")));
        assert!(doc.contains(&format!("# TYPE {UPTIME_METRIC} gauge\n")));

        let uptime_line = doc
            .lines()
            .find(|l| l.starts_with(&format!("{UPTIME_METRIC} ")))
            .unwrap();
        let value: f64 = uptime_line.split(' ').nth(1).unwrap().parse().unwrap();
        assert!(value >= 0.0 && value < 60.0);
    }
}
