//! The sync loop
//!
//! Single consumer of the work-item channel. Accumulates documents up to the
//! bulk threshold, flushes them to the sink, and checkpoints the replication
//! position under a time-debounced policy. Within one iteration the flush
//! always happens before the position save, so no position is ever durable
//! ahead of the documents it bounds.
//!
//! On shutdown any residual buffered documents are intentionally not flushed:
//! replay from the last durable position re-delivers them, and skipping the
//! final flush keeps shutdown bounded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SyncConfig;
use crate::document::Document;
use crate::error::Result;
use crate::position::{Position, PositionStore};
use crate::sink::SearchSink;

/// Work items flowing from the event handler to the sync loop.
#[derive(Debug, Clone)]
pub enum SyncItem {
    /// Checkpoint request. Non-forced saves are absorbed inside the debounce
    /// window; forced saves (rotation, DDL) always go through.
    PositionSave { position: Position, force: bool },
    /// Documents from one row event, possibly empty.
    Documents(Vec<Document>),
}

/// Counters kept by the sync loop.
#[derive(Debug, Default)]
pub struct SyncStats {
    /// Documents handed to the sink
    pub documents_flushed: AtomicU64,
    /// Non-empty bulk calls
    pub bulk_calls: AtomicU64,
    /// Positions persisted
    pub position_saves: AtomicU64,
    /// Non-forced saves absorbed by the debounce
    pub absorbed_saves: AtomicU64,
}

impl SyncStats {
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            documents_flushed: self.documents_flushed.load(Ordering::Relaxed),
            bulk_calls: self.bulk_calls.load(Ordering::Relaxed),
            position_saves: self.position_saves.load(Ordering::Relaxed),
            absorbed_saves: self.absorbed_saves.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`SyncStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    pub documents_flushed: u64,
    pub bulk_calls: u64,
    pub position_saves: u64,
    pub absorbed_saves: u64,
}

/// The single-consumer synchronization loop.
pub struct SyncLoop {
    config: SyncConfig,
    rx: mpsc::UnboundedReceiver<SyncItem>,
    sink: Arc<dyn SearchSink>,
    position_store: Arc<dyn PositionStore>,
    cancel: CancellationToken,
    stats: Arc<SyncStats>,
}

impl SyncLoop {
    pub fn new(
        config: SyncConfig,
        rx: mpsc::UnboundedReceiver<SyncItem>,
        sink: Arc<dyn SearchSink>,
        position_store: Arc<dyn PositionStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            rx,
            sink,
            position_store,
            cancel,
            stats: Arc::new(SyncStats::default()),
        }
    }

    /// Shared handle to the loop's counters.
    pub fn stats(&self) -> Arc<SyncStats> {
        self.stats.clone()
    }

    /// Run until cancellation or a fatal sink/position error.
    ///
    /// Fatal errors cancel the shared token so producers stop enqueuing on
    /// their next callback.
    pub async fn run(mut self) {
        let mut ticker = interval_at(
            Instant::now() + self.config.flush_interval,
            self.config.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buffer: Vec<Document> = Vec::with_capacity(self.config.bulk_size.max(1));
        let mut last_saved = Instant::now();
        let mut position = Position::default();

        info!(
            "sync loop started (bulk_size={}, flush_interval={:?})",
            self.config.bulk_size, self.config.flush_interval
        );

        loop {
            let mut need_flush = false;
            let mut need_save_pos = false;

            tokio::select! {
                item = self.rx.recv() => match item {
                    Some(SyncItem::PositionSave { position: pos, force }) => {
                        let now = Instant::now();
                        if force || now.duration_since(last_saved) > self.config.position_debounce {
                            last_saved = now;
                            need_flush = true;
                            need_save_pos = true;
                            position = pos;
                        } else {
                            self.stats.absorbed_saves.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Some(SyncItem::Documents(docs)) => {
                        buffer.extend(docs);
                        need_flush = buffer.len() >= self.config.bulk_size;
                    }
                    None => {
                        debug!("sync channel closed, stopping");
                        return;
                    }
                },
                _ = ticker.tick() => {
                    need_flush = true;
                }
                _ = self.cancel.cancelled() => {
                    debug!("sync loop canceled");
                    return;
                }
            }

            if need_flush {
                if let Err(e) = self.flush(&mut buffer).await {
                    error!("bulk index failed after {}: {}, closing sync", position, e);
                    self.cancel.cancel();
                    return;
                }
            }

            if need_save_pos {
                if let Err(e) = self.position_store.save(&position).await {
                    error!("save sync position {} failed: {}, closing sync", position, e);
                    self.cancel.cancel();
                    return;
                }
                self.stats.position_saves.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    async fn flush(&self, buffer: &mut Vec<Document>) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }

        self.sink.index(&self.config.indexing, buffer).await?;

        self.stats
            .documents_flushed
            .fetch_add(buffer.len() as u64, Ordering::Relaxed);
        self.stats.bulk_calls.fetch_add(1, Ordering::Relaxed);

        buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::MemoryPositionStore;
    use crate::sink::MemorySink;
    use std::time::Duration;

    fn doc(id: &str) -> Document {
        let mut d = Document::new(id);
        d.set("f", "v");
        d
    }

    struct Fixture {
        tx: mpsc::UnboundedSender<SyncItem>,
        sink: Arc<MemorySink>,
        store: Arc<MemoryPositionStore>,
        cancel: CancellationToken,
        stats: Arc<SyncStats>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(config: SyncConfig) -> Fixture {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(MemorySink::new());
        let store = Arc::new(MemoryPositionStore::new());
        let cancel = CancellationToken::new();

        let sync = SyncLoop::new(config, rx, sink.clone(), store.clone(), cancel.clone());
        let stats = sync.stats();
        let handle = tokio::spawn(sync.run());

        Fixture {
            tx,
            sink,
            store,
            cancel,
            stats,
            handle,
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_threshold_flushes() {
        let f = start(SyncConfig::builder().bulk_size(2).build());

        f.tx.send(SyncItem::Documents(vec![doc("1"), doc("2")]))
            .unwrap();

        let stats = f.stats.clone();
        wait_until(move || stats.snapshot().bulk_calls >= 1).await;

        assert_eq!(f.sink.documents().await.len(), 2);
        f.cancel.cancel();
        f.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_flushes_partial_buffer() {
        let f = start(SyncConfig::builder().bulk_size(100).build());

        f.tx.send(SyncItem::Documents(vec![doc("1")])).unwrap();

        let stats = f.stats.clone();
        wait_until(move || stats.snapshot().documents_flushed >= 1).await;

        assert_eq!(f.sink.documents().await.len(), 1);
        f.cancel.cancel();
        f.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonforced_save_is_absorbed_inside_debounce() {
        let f = start(SyncConfig::default());

        // Within the 3 s window after startup
        f.tx.send(SyncItem::PositionSave {
            position: Position::new("bin.000001", 100),
            force: false,
        })
        .unwrap();

        let stats = f.stats.clone();
        wait_until(move || stats.snapshot().absorbed_saves >= 1).await;
        assert!(f.store.saved().await.is_empty());

        f.cancel.cancel();
        f.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonforced_save_goes_through_after_debounce() {
        let f = start(SyncConfig::default());

        tokio::time::sleep(Duration::from_secs(4)).await;
        f.tx.send(SyncItem::PositionSave {
            position: Position::new("bin.000001", 200),
            force: false,
        })
        .unwrap();

        let stats = f.stats.clone();
        wait_until(move || stats.snapshot().position_saves >= 1).await;
        assert_eq!(f.store.last().await, Some(Position::new("bin.000001", 200)));

        f.cancel.cancel();
        f.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_save_skips_debounce() {
        let f = start(SyncConfig::default());

        f.tx.send(SyncItem::PositionSave {
            position: Position::new("bin.000002", 4),
            force: true,
        })
        .unwrap();

        let stats = f.stats.clone();
        wait_until(move || stats.snapshot().position_saves >= 1).await;
        assert_eq!(f.store.last().await, Some(Position::new("bin.000002", 4)));

        f.cancel.cancel();
        f.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_cancels() {
        let f = start(SyncConfig::builder().bulk_size(1).build());
        f.sink.fail_next_calls(true);

        f.tx.send(SyncItem::Documents(vec![doc("1")])).unwrap();

        f.handle.await.unwrap();
        assert!(f.cancel.is_cancelled());
        assert!(f.sink.batches().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_failure_cancels() {
        struct FailingStore;

        #[async_trait::async_trait]
        impl PositionStore for FailingStore {
            async fn save(&self, _pos: &Position) -> Result<()> {
                Err(crate::error::SyncError::position("store gone"))
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let sync = SyncLoop::new(
            SyncConfig::default(),
            rx,
            Arc::new(MemorySink::new()),
            Arc::new(FailingStore),
            cancel.clone(),
        );
        let handle = tokio::spawn(sync.run());

        tx.send(SyncItem::PositionSave {
            position: Position::new("bin.000001", 4),
            force: true,
        })
        .unwrap();

        handle.await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_without_flushing_residue() {
        let f = start(SyncConfig::builder().bulk_size(100).build());

        f.tx.send(SyncItem::Documents(vec![doc("1")])).unwrap();
        // Cancel before the ticker can fire; tokio's paused clock only
        // advances when the runtime is otherwise idle, so cancel first.
        f.cancel.cancel();
        f.handle.await.unwrap();

        assert!(f.sink.batches().await.is_empty());
    }
}
