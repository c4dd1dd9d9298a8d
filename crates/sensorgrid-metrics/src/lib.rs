//! sensorgrid-metrics — in-process gauge registry for SensorGrid.
//!
//! Producers register named gauges, create one series per tag combination
//! and update values from whatever thread or task reads the hardware. A
//! scraper renders the whole registry as one OpenMetrics text document.
//!
//! # Architecture
//!
//! ```text
//! MetricRegistry
//!   ├── create_metric() → Metric
//!   │     └── create(tags) → Series ← set() from any thread
//!   ├── add_before_collect[_async]() ← refresh hooks, run once per scrape
//!   └── collect() → "# TYPE …", sample lines, "# EOF"
//!
//! encoder
//!   └── write_type_header / write_series_line / write_document_end
//! ```
//!
//! Series holding NaN or an infinity are left out of the document, and a
//! metric without any finite series is left out entirely.

pub mod encoder;
pub mod error;
pub mod metric;
pub mod registry;
pub mod series;
pub mod tag;

pub use error::{BoxError, CollectError, CollectResult};
pub use metric::Metric;
pub use registry::{MetricRegistry, unix_millis};
pub use series::Series;
pub use tag::{IntoTagValue, Tag};
pub use tokio_util::sync::CancellationToken;
