//! Gauge metrics — a named, ordered list of series.
//!
//! Each metric guards its own list with a `parking_lot::Mutex`. The lock is
//! held for list mutation and for this metric's serialization only, never
//! across an `.await`, so producers working on other metrics are never
//! blocked by a scrape.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use crate::encoder;
use crate::series::{Series, SeriesCell};
use crate::tag::Tag;

/// Series counts up to this size are snapshotted into an inline buffer.
/// Larger metrics reuse the scrape's pooled scratch vector.
const INLINE_SNAPSHOT_LEN: usize = 32;

struct MetricShared {
    name: String,
    sort_field: Option<String>,
    series: Mutex<Vec<Arc<SeriesCell>>>,
}

/// Handle to a gauge metric owned by a [`MetricRegistry`](crate::MetricRegistry).
#[derive(Clone)]
pub struct Metric {
    shared: Arc<MetricShared>,
}

impl Metric {
    pub(crate) fn new(name: String, sort_field: Option<String>) -> Self {
        Self {
            shared: Arc::new(MetricShared {
                name,
                sort_field,
                series: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Tag key whose value orders this metric's series, if configured.
    pub fn sort_field(&self) -> Option<&str> {
        self.shared.sort_field.as_deref()
    }

    /// Number of series currently attached.
    pub fn len(&self) -> usize {
        self.shared.series.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a new series with the given tags.
    ///
    /// Duplicate tag sets are not detected; each call yields an independent
    /// series. When a sort field is configured the list is re-sorted by sort
    /// key after the insert, series without the tag first.
    pub fn create(&self, tags: impl IntoIterator<Item = Tag>) -> Series {
        let tags: Box<[Tag]> = tags.into_iter().collect();
        let cell = Arc::new(SeriesCell::new(tags, self.sort_field()));

        let mut series = self.shared.series.lock();
        series.push(cell.clone());
        if self.shared.sort_field.is_some() {
            // Stable: equal keys keep insertion order.
            series.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        }
        trace!(metric = %self.shared.name, series = series.len(), "series created");
        drop(series);

        Series::new(cell, self.clone())
    }

    /// Remove a series by identity. Returns whether it was present.
    pub(crate) fn unregister(&self, cell: &Arc<SeriesCell>) -> bool {
        let mut series = self.shared.series.lock();
        match series.iter().position(|s| Arc::ptr_eq(s, cell)) {
            Some(index) => {
                series.remove(index);
                trace!(metric = %self.shared.name, series = series.len(), "series removed");
                true
            }
            None => false,
        }
    }

    /// Serialize this metric's finite series into `out`.
    ///
    /// Values are copied out first so the finite check and the emitted lines
    /// agree even while producers keep writing. Nothing at all is written
    /// when no series holds a finite value. Returns the number of sample
    /// lines written.
    pub(crate) fn write(&self, out: &mut Vec<u8>, timestamp_ms: i64, scratch: &mut Vec<f64>) -> usize {
        let series = self.shared.series.lock();

        if series.len() <= INLINE_SNAPSHOT_LEN {
            let values: SmallVec<[f64; INLINE_SNAPSHOT_LEN]> =
                series.iter().map(|s| s.value()).collect();
            self.encode(out, timestamp_ms, &series, &values)
        } else {
            scratch.clear();
            scratch.extend(series.iter().map(|s| s.value()));
            self.encode(out, timestamp_ms, &series, scratch)
        }
    }

    fn encode(&self, out: &mut Vec<u8>, timestamp_ms: i64, series: &[Arc<SeriesCell>], values: &[f64]) -> usize {
        if !values.iter().any(|v| v.is_finite()) {
            return 0;
        }

        encoder::write_type_header(out, &self.shared.name);

        let mut lines = 0;
        for (cell, &value) in series.iter().zip(values) {
            if value.is_finite() {
                encoder::write_series_line(out, timestamp_ms, &self.shared.name, value, cell.tags());
                lines += 1;
            }
        }
        lines
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.shared.name)
            .field("sort_field", &self.shared.sort_field)
            .field("series", &self.len())
            .finish()
    }
}
