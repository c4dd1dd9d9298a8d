//! Exporter loop — collects the registry on an interval and publishes each
//! document to stdout or a textfile.
//!
//! File output is written to a sibling `.tmp` file and renamed into place,
//! so a reader never sees a partially written document.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use sensorgrid_metrics::{CancellationToken, MetricRegistry, unix_millis};

/// Where documents are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    pub fn from_output(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Sink::File(path.to_path_buf()),
            None => Sink::Stdout,
        }
    }

    async fn publish(&self, document: &[u8]) -> anyhow::Result<()> {
        match self {
            Sink::Stdout => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(document).await?;
                stdout.flush().await?;
            }
            Sink::File(path) => {
                let tmp = temp_path(path);
                tokio::fs::write(&tmp, document)
                    .await
                    .with_context(|| format!("failed to write {}", tmp.display()))?;
                if let Err(e) = tokio::fs::rename(&tmp, path).await {
                    let _ = tokio::fs::remove_file(&tmp).await;
                    return Err(e).with_context(|| format!("failed to move document into {}", path.display()));
                }
            }
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Periodically collects a registry and publishes the result.
pub struct Exporter {
    registry: MetricRegistry,
    sink: Sink,
    interval: Duration,
}

impl Exporter {
    pub fn new(registry: MetricRegistry, sink: Sink, interval: Duration) -> Self {
        Self {
            registry,
            sink,
            interval,
        }
    }

    /// Collect once into `buffer` and publish it. Returns the document size.
    ///
    /// `buffer` is cleared first, so a failed collection never leaks into
    /// the next publish.
    pub async fn export_once(&self, buffer: &mut Vec<u8>, cancel: &CancellationToken) -> anyhow::Result<usize> {
        buffer.clear();
        self.registry
            .collect(buffer, unix_millis(), cancel)
            .await
            .context("collection failed")?;
        self.sink.publish(buffer).await?;
        Ok(buffer.len())
    }

    /// Run the export loop until the shutdown signal fires. An in-flight
    /// collection is cancelled on shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            sink = ?self.sink,
            "exporter started"
        );

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _ = shutdown.changed().await;
                cancel.cancel();
            })
        };

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buffer = Vec::with_capacity(16 * 1024);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.export_once(&mut buffer, &cancel).await {
                        Ok(bytes) => debug!(bytes, "document published"),
                        Err(_) if cancel.is_cancelled() => break,
                        Err(e) => warn!(error = %format!("{e:#}"), "export failed"),
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        watcher.abort();
        info!("exporter stopped");
    }
}
