//! Metric registry — the entry point for producers and scrapers.
//!
//! Producers create metrics and series here and register callbacks that run
//! right before each collection. A scraper calls [`MetricRegistry::collect`]
//! to render one complete exposition document.

use std::future::Future;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures::future::{BoxFuture, FutureExt, try_join_all};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::encoder;
use crate::error::{BoxError, CollectError, CollectResult};
use crate::metric::Metric;

type SyncCallback = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

type AsyncCallback =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

struct RegistryShared {
    metrics: RwLock<Vec<Metric>>,
    before_collect: RwLock<Vec<SyncCallback>>,
    before_collect_async: RwLock<Vec<AsyncCallback>>,
    /// Held for the whole of a collection. The guarded vector is the pooled
    /// snapshot buffer for metrics too large for the inline one.
    scrape_gate: Mutex<Vec<f64>>,
}

/// Registry of gauge metrics.
///
/// Cloning yields another handle to the same registry. Metrics and callbacks
/// are never removed once added.
#[derive(Clone)]
pub struct MetricRegistry {
    shared: Arc<RegistryShared>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                metrics: RwLock::new(Vec::new()),
                before_collect: RwLock::new(Vec::new()),
                before_collect_async: RwLock::new(Vec::new()),
                scrape_gate: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a gauge whose series keep insertion order.
    ///
    /// Names are not checked for uniqueness; two metrics with the same name
    /// each emit their own `# TYPE` header.
    pub fn create_metric(&self, name: impl Into<String>) -> Metric {
        self.register(name.into(), None)
    }

    /// Register a gauge whose series are ordered by the value of the
    /// `sort_field` tag.
    pub fn create_metric_sorted_by(&self, name: impl Into<String>, sort_field: impl Into<String>) -> Metric {
        self.register(name.into(), Some(sort_field.into()))
    }

    fn register(&self, name: String, sort_field: Option<String>) -> Metric {
        let metric = Metric::new(name, sort_field);
        self.shared.metrics.write().push(metric.clone());
        debug!(
            metric = %metric.name(),
            sort_field = ?metric.sort_field(),
            "metric registered"
        );
        metric
    }

    /// Number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.shared.metrics.read().len()
    }

    /// Run `callback` at the start of every collection, in registration
    /// order, before any async callback starts.
    pub fn add_before_collect<F>(&self, callback: F)
    where
        F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.shared.before_collect.write().push(Arc::new(callback));
    }

    /// Run `callback` at the start of every collection, after the sync
    /// callbacks and concurrently with the other async callbacks.
    pub fn add_before_collect_async<F, Fut>(&self, callback: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let callback: AsyncCallback = Arc::new(move |cancel| callback(cancel).boxed());
        self.shared.before_collect_async.write().push(callback);
    }

    /// Render one exposition document into `out`.
    ///
    /// Only one collection runs at a time; concurrent calls wait their turn.
    /// On error the bytes appended to `out` are not a valid document.
    /// Cancellation is honored while waiting for the gate, during the async
    /// callbacks, and between metrics, never in the middle of a line.
    pub async fn collect(
        &self,
        out: &mut Vec<u8>,
        timestamp_ms: i64,
        cancel: &CancellationToken,
    ) -> CollectResult<()> {
        let mut scratch = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CollectError::Cancelled),
            guard = self.shared.scrape_gate.lock() => guard,
        };
        let started = Instant::now();

        self.run_before_collect(cancel).await?;

        let metrics = self.shared.metrics.read().clone();
        let start_len = out.len();
        let mut emitted = 0;

        for metric in &metrics {
            if cancel.is_cancelled() {
                debug!("collection cancelled during serialization");
                return Err(CollectError::Cancelled);
            }
            if metric.write(out, timestamp_ms, &mut scratch) > 0 {
                emitted += 1;
            }
        }
        encoder::write_document_end(out);

        debug!(
            metrics = metrics.len(),
            emitted,
            bytes = out.len() - start_len,
            elapsed_us = started.elapsed().as_micros() as u64,
            "collection complete"
        );
        Ok(())
    }

    /// Collect into a fresh `String`, without cancellation.
    pub async fn render(&self, timestamp_ms: i64) -> CollectResult<String> {
        let mut out = Vec::new();
        self.collect(&mut out, timestamp_ms, &CancellationToken::new()).await?;
        // Every byte written comes from a `&str`, so this is always valid.
        Ok(String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    async fn run_before_collect(&self, cancel: &CancellationToken) -> CollectResult<()> {
        // Snapshot the lists so callbacks may register more without deadlocking.
        let sync_callbacks = self.shared.before_collect.read().clone();
        for callback in &sync_callbacks {
            callback().map_err(|e| {
                warn!(error = %e, "before-collect callback failed");
                CollectError::Callback(e)
            })?;
        }

        let async_callbacks = self.shared.before_collect_async.read().clone();
        if !async_callbacks.is_empty() {
            let pending = try_join_all(async_callbacks.iter().map(|callback| callback(cancel.clone())));
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CollectError::Cancelled),
                result = pending => result.map(drop).map_err(CollectError::Callback),
            };
            match &outcome {
                Err(CollectError::Cancelled) => debug!("collection cancelled during callbacks"),
                Err(CollectError::Callback(source)) => {
                    warn!(error = %source, "async before-collect callback failed")
                }
                Ok(()) => {}
            }
            outcome?;
        }

        if cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }
        Ok(())
    }
}

/// Milliseconds since the Unix epoch, for use as a scrape timestamp.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::Tag;

    #[tokio::test]
    async fn empty_registry_renders_only_eof() {
        let registry = MetricRegistry::new();
        assert_eq!(registry.render(1).await.unwrap(), "# EOF\n");
    }

    #[tokio::test]
    async fn metrics_serialize_in_registration_order() {
        let registry = MetricRegistry::new();
        let b = registry.create_metric("b_metric");
        let a = registry.create_metric("a_metric");
        b.create([]).set(2.0);
        a.create([]).set(1.0);

        assert_eq!(
            registry.render(7).await.unwrap(),
            "# TYPE b_metric gauge\nb_metric 2 7\n# TYPE a_metric gauge\na_metric 1 7\n# EOF\n"
        );
        assert_eq!(registry.metric_count(), 2);
    }

    #[tokio::test]
    async fn duplicate_names_each_get_a_header() {
        let registry = MetricRegistry::new();
        registry.create_metric("dup").create([Tag::new("n", 1)]).set(1.0);
        registry.create_metric("dup").create([Tag::new("n", 2)]).set(2.0);

        let doc = registry.render(0).await.unwrap();
        assert_eq!(doc.matches("# TYPE dup gauge\n").count(), 2);
    }

    #[tokio::test]
    async fn sync_callbacks_run_in_order_before_async_ones() {
        let registry = MetricRegistry::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for name in ["sync-1", "sync-2"] {
            let log = log.clone();
            registry.add_before_collect(move || {
                log.lock().push(name);
                Ok(())
            });
        }
        let async_log = log.clone();
        registry.add_before_collect_async(move |_| {
            let log = async_log.clone();
            async move {
                log.lock().push("async");
                Ok::<(), BoxError>(())
            }
        });

        registry.render(0).await.unwrap();
        registry.render(0).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["sync-1", "sync-2", "async", "sync-1", "sync-2", "async"]
        );
    }

    #[tokio::test]
    async fn async_callbacks_run_concurrently() {
        let registry = MetricRegistry::new();
        // Each callback waits for the other, so sequential execution would hang.
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        for _ in 0..2 {
            let barrier = barrier.clone();
            registry.add_before_collect_async(move |_| {
                let barrier = barrier.clone();
                async move {
                    barrier.wait().await;
                    Ok::<(), BoxError>(())
                }
            });
        }

        let rendered = tokio::time::timeout(Duration::from_secs(5), registry.render(0)).await;
        assert_eq!(rendered.unwrap().unwrap(), "# EOF\n");
    }

    #[tokio::test]
    async fn callbacks_refresh_values_before_serialization() {
        let registry = MetricRegistry::new();
        let series = registry.create_metric("uptime_seconds").create([]);
        let ticks = Arc::new(AtomicUsize::new(0));

        let refresh = series.clone();
        let counter = ticks.clone();
        registry.add_before_collect(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            refresh.set(n as f64 * 10.0);
            Ok(())
        });

        assert!(registry.render(3).await.unwrap().contains("uptime_seconds 10 3\n"));
        assert!(registry.render(4).await.unwrap().contains("uptime_seconds 20 4\n"));
    }

    #[tokio::test]
    async fn callback_failure_aborts_scrape_but_not_the_next() {
        let registry = MetricRegistry::new();
        registry.create_metric("smart_temp").create([]).set(40.0);

        let fail = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let flag = fail.clone();
        registry.add_before_collect(move || {
            if flag.load(Ordering::SeqCst) {
                Err("sensor bus unavailable".into())
            } else {
                Ok(())
            }
        });

        let mut out = Vec::new();
        let err = registry
            .collect(&mut out, 1, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Callback(_)));
        assert!(err.to_string().contains("sensor bus unavailable"));
        assert!(out.is_empty());

        fail.store(false, Ordering::SeqCst);
        assert_eq!(
            registry.render(2).await.unwrap(),
            "# TYPE smart_temp gauge\nsmart_temp 40 2\n# EOF\n"
        );
    }

    #[tokio::test]
    async fn async_callback_failure_propagates() {
        let registry = MetricRegistry::new();
        registry.add_before_collect_async(|_| async { Err::<(), BoxError>("wmi query failed".into()) });

        let err = registry.render(0).await.unwrap_err();
        assert!(matches!(err, CollectError::Callback(_)));
    }

    #[tokio::test]
    async fn cancellation_during_async_callbacks_writes_nothing() {
        let registry = MetricRegistry::new();
        registry.create_metric("ping_rtt_ms").create([]).set(12.0);
        registry.add_before_collect_async(|_| std::future::pending::<Result<(), BoxError>>());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut out = Vec::new();
        let err = registry.collect(&mut out, 0, &cancel).await.unwrap_err();
        assert!(matches!(err, CollectError::Cancelled));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn callbacks_receive_the_scrape_token() {
        let registry = MetricRegistry::new();
        let received = Arc::new(parking_lot::Mutex::new(None));
        let slot = received.clone();
        registry.add_before_collect_async(move |token| {
            let slot = slot.clone();
            async move {
                *slot.lock() = Some(token);
                Ok::<(), BoxError>(())
            }
        });

        let cancel = CancellationToken::new();
        registry.collect(&mut Vec::new(), 0, &cancel).await.unwrap();
        cancel.cancel();

        let token = received.lock().take().unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_token_fails_fast() {
        let registry = MetricRegistry::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut out = Vec::new();
        let err = registry.collect(&mut out, 0, &cancel).await.unwrap_err();
        assert!(matches!(err, CollectError::Cancelled));
        assert!(out.is_empty());
    }

    #[test]
    fn unix_millis_is_after_2023() {
        assert!(unix_millis() > 1_700_000_000_000);
    }
}
