//! A single tagged gauge value.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::metric::Metric;
use crate::tag::Tag;

/// Storage shared between a [`Series`] handle and its metric's series list.
pub(crate) struct SeriesCell {
    tags: Box<[Tag]>,
    /// IEEE-754 bits of the current value.
    bits: AtomicU64,
    sort_key: Option<String>,
}

impl SeriesCell {
    pub(crate) fn new(tags: Box<[Tag]>, sort_field: Option<&str>) -> Self {
        let sort_key = sort_field.and_then(|field| {
            tags.iter()
                .find(|tag| tag.key() == field)
                .map(|tag| tag.value().to_string())
        });
        Self {
            tags,
            bits: AtomicU64::new(f64::NAN.to_bits()),
            sort_key,
        }
    }

    pub(crate) fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub(crate) fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }

    pub(crate) fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

/// Handle to one series of a [`Metric`].
///
/// The value starts as NaN, which keeps the series out of scrapes until a
/// producer stores a finite reading. Handles are cheap to clone and can be
/// moved to whichever thread or task produces the readings.
#[derive(Clone)]
pub struct Series {
    cell: Arc<SeriesCell>,
    owner: Metric,
}

impl Series {
    pub(crate) fn new(cell: Arc<SeriesCell>, owner: Metric) -> Self {
        Self { cell, owner }
    }

    /// Current value. Never observes a partially written update.
    pub fn value(&self) -> f64 {
        self.cell.value()
    }

    /// Store a new value. Storing NaN or an infinity hides the series from
    /// subsequent scrapes without removing it.
    pub fn set(&self, value: f64) {
        self.cell.set(value);
    }

    /// Tags in creation order.
    pub fn tags(&self) -> &[Tag] {
        self.cell.tags()
    }

    /// Value of the owning metric's sort field for this series, if any.
    pub fn sort_key(&self) -> Option<&str> {
        self.cell.sort_key()
    }

    /// The metric this series belongs to.
    pub fn metric(&self) -> &Metric {
        &self.owner
    }

    /// Detach this series from its metric.
    ///
    /// Removing an already removed series leaves the metric untouched.
    pub fn remove(&self) {
        self.owner.unregister(&self.cell);
    }
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("metric", &self.owner.name())
            .field("tags", &self.cell.tags())
            .field("value", &self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricRegistry;

    #[test]
    fn new_series_holds_nan() {
        let registry = MetricRegistry::new();
        let series = registry.create_metric("smart_temp").create([Tag::new("disk", "sda")]);
        assert!(series.value().is_nan());
    }

    #[test]
    fn set_then_get() {
        let registry = MetricRegistry::new();
        let series = registry.create_metric("smart_temp").create([]);
        series.set(41.0);
        assert_eq!(series.value(), 41.0);
        series.set(f64::NEG_INFINITY);
        assert_eq!(series.value(), f64::NEG_INFINITY);
    }

    #[test]
    fn sort_key_comes_from_matching_tag() {
        let registry = MetricRegistry::new();
        let metric = registry.create_metric_sorted_by("wifi_signal", "ssid");
        let series = metric.create([Tag::new("band", "5GHz"), Tag::new("ssid", "lab")]);
        assert_eq!(series.sort_key(), Some("lab"));

        let untagged = metric.create([Tag::new("band", "2.4GHz")]);
        assert_eq!(untagged.sort_key(), None);
    }

    #[test]
    fn series_knows_its_metric() {
        let registry = MetricRegistry::new();
        let metric = registry.create_metric_sorted_by("wifi_signal", "ssid");
        let series = metric.create([Tag::new("ssid", "lab")]);

        assert_eq!(series.metric().name(), "wifi_signal");
        assert_eq!(series.metric().sort_field(), Some("ssid"));

        // The handle reaches the same list the registry scrapes.
        series.metric().create([Tag::new("ssid", "guest")]);
        assert_eq!(metric.len(), 2);
    }

    #[test]
    fn no_sort_key_without_sort_field() {
        let registry = MetricRegistry::new();
        let series = registry.create_metric("wifi_signal").create([Tag::new("ssid", "lab")]);
        assert_eq!(series.sort_key(), None);
    }

    #[test]
    fn concurrent_writers_never_tear() {
        let registry = MetricRegistry::new();
        let series = registry.create_metric("ping_rtt_ms").create([]);
        let candidates = [1.5_f64, -2.25, 1e300, 7.0];

        std::thread::scope(|scope| {
            for &value in &candidates {
                let series = series.clone();
                scope.spawn(move || {
                    for _ in 0..10_000 {
                        series.set(value);
                    }
                });
            }
            for _ in 0..10_000 {
                let seen = series.value();
                assert!(seen.is_nan() || candidates.contains(&seen), "torn read: {seen}");
            }
        });
    }
}
