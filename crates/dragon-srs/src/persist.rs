// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget persistence for engine mutations.
//!
//! Mutations enqueue a [`PersistOp`] and return immediately. A single
//! background task drains the queue in order, so writes for one key land in
//! issuance order. Failures are logged at `warn` and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, warn};

use dragon_bus::{BusEvent, EventBus};
use dragon_core::types::{ActivityEvent, ReviewItem};
use dragon_core::{DragonError, StorageBackend};

/// One queued write. The profile id is captured when the op is created.
#[derive(Debug)]
pub enum PersistOp {
    UpsertItem {
        item: ReviewItem,
        profile: Option<String>,
    },
    RemoveItem {
        key: String,
        profile: Option<String>,
    },
    AppendEvent {
        event: ActivityEvent,
        profile: Option<String>,
    },
    /// Resolves once every op queued before it has been applied.
    Flush(oneshot::Sender<()>),
}

/// Counters shared between the queue handle and its task.
#[derive(Debug, Default)]
struct Counters {
    applied: AtomicU64,
    failed: AtomicU64,
}

/// Handle to the background writer task.
#[derive(Debug, Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistOp>,
    counters: Arc<Counters>,
}

impl PersistQueue {
    /// Spawn the writer task on the current tokio runtime.
    ///
    /// After each persisted event an [`BusEvent::ActivityUpdated`] is
    /// published on `bus`.
    pub fn spawn(backend: Arc<dyn StorageBackend>, bus: Arc<EventBus>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistOp>();
        let counters = Arc::new(Counters::default());
        let task_counters = counters.clone();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let (what, result) = match op {
                    PersistOp::Flush(done) => {
                        let _ = done.send(());
                        continue;
                    }
                    PersistOp::UpsertItem { item, profile } => (
                        "item_upsert",
                        backend.item_upsert(&item, profile.as_deref()).await,
                    ),
                    PersistOp::RemoveItem { key, profile } => (
                        "item_remove",
                        backend.item_remove(&key, profile.as_deref()).await,
                    ),
                    PersistOp::AppendEvent { event, profile } => {
                        let result = backend.event_append(&event, profile.as_deref()).await;
                        if result.is_ok() {
                            bus.publish(BusEvent::ActivityUpdated {
                                kind: event.kind().to_string(),
                            });
                        }
                        ("event_append", result)
                    }
                };
                record(&task_counters, what, result);
            }
            debug!("persist queue closed");
        }
        .in_current_span());

        Self { tx, counters }
    }

    /// Queue a write. Never blocks and never fails the caller.
    pub fn enqueue(&self, op: PersistOp) {
        if self.tx.send(op).is_err() {
            warn!("persist queue closed, dropping write");
        }
    }

    /// Wait until every write queued so far has been applied or dropped.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PersistOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Writes applied successfully since start.
    pub fn applied_count(&self) -> u64 {
        self.counters.applied.load(Ordering::Relaxed)
    }

    /// Writes that failed and were dropped since start.
    pub fn failed_count(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }
}

fn record(counters: &Counters, what: &'static str, result: Result<(), DragonError>) {
    match result {
        Ok(()) => {
            counters.applied.fetch_add(1, Ordering::Relaxed);
            debug!(op = what, "persisted");
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(op = what, error = %e, "persistence failed, change kept in memory only");
        }
    }
}
